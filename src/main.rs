use std::env;
use std::net::SocketAddr;

use rickshaw::engine::Engine;
use rickshaw::server::serve;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let host = env::var("RICKSHAW_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("RICKSHAW_PORT").unwrap_or_else(|_| "3000".to_string());

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("invalid RICKSHAW_ADDR/RICKSHAW_PORT");

    let engine = Engine::new();

    serve(engine, addr).await;
}
