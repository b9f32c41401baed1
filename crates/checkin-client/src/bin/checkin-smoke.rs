//! Ledger smoke test
//!
//! Posts one synthetic append record to a ledger endpoint and prints what
//! came back.
//!
//! Built with `--features cli`.
//!
//! ## Usage
//!
//! ```bash
//! checkin-smoke https://script.example/macros/s/XYZ/exec
//!
//! # or
//! export CHECKIN_LEDGER_URL="https://script.example/macros/s/XYZ/exec"
//! checkin-smoke
//! ```

use checkin_client::config::ENDPOINT_ENV;
use checkin_client::protocol::LedgerRequest;
use checkin_client::transport::JSON_CONTENT_TYPE;
use checkin_client::{
    HttpTransport, LedgerTransport, MonthStamp, ResponseVisibility, SubmissionRecord,
    TransportReply,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "checkin-smoke")]
#[command(about = "Send one synthetic check-in record to a ledger endpoint")]
struct Args {
    /// Ledger endpoint URL
    #[arg(env = "CHECKIN_LEDGER_URL")]
    url: Option<String>,

    /// Email used for the synthetic record
    #[arg(long, default_value = "test@example.com")]
    email: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("checkin_client=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let Some(url) = args.url.filter(|u| !u.trim().is_empty()) else {
        eprintln!("Error: a ledger endpoint URL is required\n");
        eprintln!("Usage:");
        eprintln!("  checkin-smoke <LEDGER_URL>");
        eprintln!("\nOr set the environment variable:");
        eprintln!("  export {}=\"your_url_here\"", ENDPOINT_ENV);
        eprintln!("  checkin-smoke");
        std::process::exit(1);
    };

    let record = SubmissionRecord::new(args.email, MonthStamp::current())
        .with_completion(85.0)
        .with_bugs(2)
        .with_satisfaction(4.0)
        .with_comments("Synthetic record sent by checkin-smoke");

    let body = LedgerRequest::Append { data: &record }.to_body()?;
    let pretty: serde_json::Value = serde_json::from_str(&body)?;

    println!("Sending test record to ledger...");
    println!("\nPayload:\n{}", serde_json::to_string_pretty(&pretty)?);
    println!("\nURL: {}", url);

    let transport = HttpTransport::new(None)?;
    match transport
        .post(url.trim(), JSON_CONTENT_TYPE, body, ResponseVisibility::Readable)
        .await
    {
        Ok(TransportReply::Readable { status, body }) => {
            println!("\nResponse status: {}", status);
            match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(json) => println!("Response:\n{}", serde_json::to_string_pretty(&json)?),
                Err(_) => println!("Response (text): {}", body),
            }
            println!("\nDone. Check the ledger to confirm the row was written.");
        }
        Ok(TransportReply::Opaque) => {
            println!("\nRequest dispatched; the response is opaque.");
        }
        Err(e) => {
            eprintln!("\nError sending record: {}", e);
            eprintln!("Note: endpoints that do not expose responses cross-origin may still");
            eprintln!("have written the row. Check the ledger directly.");
        }
    }

    Ok(())
}
