use anyhow::{Result, bail};
use chrono::Utc;
use clap::Parser;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

/// Exercises a running server end to end.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = "http://localhost:8000")]
    base_url: String,

    /// Email used for the test lead. Must not have submitted in the last 24 hours.
    #[arg(long, default_value = "smoke-test@example.com")]
    email: String,

    /// Clear the dedup key afterwards so the run can be repeated.
    #[arg(long)]
    cleanup: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = Client::new();
    let api = format!("{}/api", args.base_url.trim_end_matches('/'));

    let health: Value = client
        .get(format!("{api}/health"))
        .send()
        .await?
        .json()
        .await?;
    println!("Health: {health}");

    let lead = json!({
        "name": "Smoke Test",
        "email": args.email,
        "niche": "saas",
        "problem": "checking the pipeline"
    });

    let response = client.post(format!("{api}/leads")).json(&lead).send().await?;
    let status = response.status();
    let body: Value = response.json().await?;
    println!("Lead: {status} {body}");
    if status != StatusCode::OK {
        bail!("lead submission failed");
    }

    let response = client.post(format!("{api}/leads")).json(&lead).send().await?;
    let status = response.status();
    println!("Resubmission: {status} {}", response.text().await?);
    if status != StatusCode::BAD_REQUEST {
        println!("Resubmission was not rejected, is Redis running?");
    }

    let event = json!({
        "name": "smoke_test",
        "timestamp": Utc::now().to_rfc3339(),
        "url": args.base_url,
        "buttonText": "tester"
    });
    let tracked: Value = client
        .post(format!("{api}/analytics"))
        .json(&event)
        .send()
        .await?
        .json()
        .await?;
    println!("Analytics: {tracked}");

    let chat: Value = client
        .post(format!("{api}/chat"))
        .json(&json!({ "message": "smoke test", "user_email": args.email }))
        .send()
        .await?
        .json()
        .await?;
    println!("Chat: {chat}");

    for listing in ["leads", "leads/mirror", "analytics"] {
        let body: Value = client
            .get(format!("{api}/{listing}"))
            .send()
            .await?
            .json()
            .await?;
        println!("{listing}: {} records", body["count"]);
    }

    if args.cleanup {
        client
            .delete(format!("{api}/leads/{}/dedup", args.email))
            .send()
            .await?;
        println!("Cleared dedup key for {}", args.email);
    }

    Ok(())
}

