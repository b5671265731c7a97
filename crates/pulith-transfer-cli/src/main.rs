use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use pulith_transfer::{ClientConfig, ReqwestTransport, TransferClient, UploadPayload, global};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{App, Commands, RequestArg, parse_header, parse_pair};
use tracker::TransferTracker;

mod cli;
mod tracker;

type Client = TransferClient<ReqwestTransport>;

fn main() -> Result<()> {
    let app = App::parse();
    init_tracing(app.verbose);

    // teardown on exit
    let _guard = global::init();

    let config = match &app.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    let mut client = TransferClient::with_config(ReqwestTransport::new(), &config);

    run(&mut client, app.cmd)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(client: &mut Client, cmd: Commands) -> Result<()> {
    let tracker = TransferTracker::new(match &cmd {
        Commands::Get(_) => "GET",
        Commands::Post(_) => "POST",
        Commands::Multipart(_) => "MULTIPART",
        Commands::Upload(_) => "UPLOAD",
    });
    client.set_progress_callback(tracker.callback());

    let (request, outcome) = match cmd {
        Commands::Get(arg) => {
            prepare(client, &arg.request)?;
            let outcome = client.do_get(None);
            (arg.request, outcome)
        }
        Commands::Post(arg) => {
            prepare(client, &arg.request)?;
            for param in &arg.params {
                let (name, value) = parse_pair(param)?;
                client.add_query_param(name, value);
            }
            let outcome = client.do_post(arg.data.as_deref().unwrap_or_default());
            (arg.request, outcome)
        }
        Commands::Multipart(arg) => {
            prepare(client, &arg.request)?;
            for param in &arg.params {
                let (name, value) = parse_pair(param)?;
                client.add_query_param(name, value);
            }
            for file in &arg.files {
                let (name, path) = parse_pair(file)?;
                let display_name = Path::new(path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.to_string());
                client.add_query_param_file(name, path, display_name, "");
            }
            let outcome = client.do_upload_multipart();
            (arg.request, outcome)
        }
        Commands::Upload(arg) => {
            prepare(client, &arg.request)?;
            if let Some(method) = &arg.method {
                client.set_method(method.as_str());
            }
            if let (Some(offset), Some(size)) = (arg.chunk_offset, arg.chunk_size) {
                client.set_chunk_offset(offset).set_chunk_size(size);
            }
            let outcome = client.do_upload(UploadPayload::File(arg.file.clone()));
            (arg.request, outcome)
        }
    };
    tracker.finish();

    if let Err(e) = outcome {
        let result = client.result_string();
        return Err(e).with_context(|| format!("transfer to {} failed ({result})", request.url));
    }
    report(client, &request)
}

fn prepare(client: &mut Client, request: &RequestArg) -> Result<()> {
    client.set_url(request.url.as_str());
    for header in &request.headers {
        let (name, value) = parse_header(header)?;
        client.add_query_header(name, value);
    }
    if let Some(agent) = &request.user_agent {
        client.set_user_agent(agent.as_str());
    }
    if let Some(output) = &request.output {
        client.set_output_file(output);
    }
    client.set_treat_errors_as_warnings(request.quiet_errors);
    Ok(())
}

const SHOWN_HEADERS: [&str; 3] = ["content-type", "content-length", "location"];

fn report(client: &Client, request: &RequestArg) -> Result<()> {
    let code = client.response_code();
    eprintln!("HTTP {code}");
    for name in SHOWN_HEADERS {
        if let Some(value) = client.response_header(name) {
            eprintln!("{name}: {value}");
        }
    }

    match &request.output {
        Some(path) => info!(code, path = %path.display(), "saved response body"),
        None => {
            io::stdout()
                .write_all(client.response_body())
                .context("failed to write response body")?;
        }
    }
    if code >= 400 {
        warn!(code, url = %request.url, "server returned an error status");
    }
    Ok(())
}
