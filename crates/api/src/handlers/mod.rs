pub mod upload_queue;
