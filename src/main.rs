//! Courier - headless runner for saved requests
//!
//! `courier` lists saved requests; `courier <id-or-name>...` sends them
//! concurrently and prints each normalized response as JSON.

use anyhow::bail;
use futures_util::future::join_all;

use courier::constants::APP_VERSION;
use courier::{
    format_bytes, format_time, logging, ApiClient, ApiRequest, ClientActor, Config, FileStore,
    HttpTransport,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    let _guard = logging::init(&config)?;
    tracing::info!(version = APP_VERSION, data_dir = %config.data_dir.display(), "Starting");

    let store = FileStore::new(config.data_dir.clone());
    let transport = HttpTransport::new(&config)?;
    let client = ApiClient::load(store, transport).await;

    let targets: Vec<String> = std::env::args().skip(1).collect();
    if targets.is_empty() {
        let requests = &client.state().requests;
        if requests.is_empty() {
            println!("No saved requests in {}", config.data_dir.display());
        }
        for request in requests {
            println!("{}  {:<6}  {}", request.id, request.method.as_str(), request.name);
        }
        return Ok(());
    }

    let mut selected: Vec<ApiRequest> = Vec::with_capacity(targets.len());
    for target in &targets {
        let found = client
            .state()
            .requests
            .iter()
            .find(|r| &r.id == target)
            .or_else(|| client.state().requests.iter().find(|r| &r.name == target));
        match found {
            Some(request) => selected.push(request.clone()),
            None => bail!("No saved request with id or name {:?}", target),
        }
    }

    let handle = ClientActor::spawn(client);
    let sends = selected.into_iter().map(|request| {
        let handle = handle.clone();
        async move {
            let response = handle.send(request.clone()).await;
            (request, response)
        }
    });

    for (request, response) in join_all(sends).await {
        let response = response?;
        eprintln!(
            "{} {} -> {} {} ({}, {})",
            request.method,
            request.name,
            response.status,
            response.status_text,
            format_time(response.time),
            format_bytes(response.size),
        );
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    handle.shutdown().await?;
    Ok(())
}
