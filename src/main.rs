use sofar_bridge::prelude::*;

#[tokio::main]
async fn main() {
    let options = Options::new();

    if let Err(err) = sofar_bridge::app(options).await {
        // logging may not be up yet if the config failed to load
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
