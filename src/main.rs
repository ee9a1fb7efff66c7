//! wirecheck CLI entry point

#[tokio::main(flavor = "current_thread")]
async fn main() {
    wirecheck::cli::run().await;
}
