#[tokio::main]
async fn main() {
    gallery_backend::run().await;
}
