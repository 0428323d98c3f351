//! The helper futures must be `Send` so they can run on `tokio::spawn`.

use std::sync::Arc;
use storage_utils::{
    delete_file, upload_file, upload_image, MemoryStorageClient, NotificationLog,
    StorageConfig, StorageContext, UploadFile, UploadOptions,
};

fn assert_send<T: Send>(_: &T) {}

#[test]
fn test_helper_futures_are_send() {
    let ctx = StorageContext::in_memory(StorageConfig::new()).expect("valid config");
    let file = UploadFile::new("a.png", "image/png", vec![1]);

    let upload = upload_file(&ctx, &file, "a.png", UploadOptions::new());
    assert_send(&upload);
    let image = upload_image(&ctx, &file, "a.png");
    assert_send(&image);
    let delete = delete_file(&ctx, "a.png");
    assert_send(&delete);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uploads_on_spawned_tasks() {
    let config = StorageConfig::new().chunk_size(64);
    let client = MemoryStorageClient::new(&config);
    let notifications = Arc::new(NotificationLog::new());
    let ctx = StorageContext::new(Arc::new(client.clone()), notifications.clone(), config)
        .expect("valid config");

    let mut handles = Vec::new();
    for i in 0..16 {
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            let file = UploadFile::new(format!("{i}.bin"), "application/octet-stream", vec![i as u8; 1000]);
            upload_file(&ctx, &file, &format!("batch/{i}.bin"), UploadOptions::new()).await
        }));
    }

    for handle in handles {
        handle.await.expect("task panicked").expect("upload failed");
    }

    assert_eq!(client.len(), 16);
    assert_eq!(client.object_data("batch/7.bin").unwrap(), vec![7u8; 1000]);
    assert_eq!(notifications.successes().len(), 16);
}
