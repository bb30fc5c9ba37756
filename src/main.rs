use anyhow::Result;

use delta_ups_bridge::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::new();

    if let Err(e) = delta_ups_bridge::run(options).await {
        error!("Application error: {:?}", e);
        return Err(e);
    }

    Ok(())
}
