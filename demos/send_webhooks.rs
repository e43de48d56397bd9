use argh::FromArgs;
use serde_json::json;

/// Fire a few sample webhooks at a running webhook-catcher.
#[derive(FromArgs)]
struct Args {
    /// base URL of the catcher (default: http://127.0.0.1:3000)
    #[argh(option, default = "String::from(\"http://127.0.0.1:3000\")")]
    url: String,
}

#[tokio::main]
async fn main() -> Result<(), reqwest::Error> {
    let args: Args = argh::from_env();
    let client = reqwest::Client::new();

    let push = json!({
        "ref": "refs/heads/main",
        "commits": [{ "id": "0d1a26e6", "message": "Fix typo" }],
        "pusher": { "name": "octocat" }
    });
    let response = client
        .post(format!("{}/hooks/github", args.url))
        .header("Content-Type", "application/json")
        .header("X-GitHub-Event", "push")
        .body(push.to_string())
        .send()
        .await?;
    println!("json:  {} {}", response.status(), response.text().await?);

    let response = client
        .post(format!("{}/hooks/form", args.url))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body("name=test&amount=42")
        .send()
        .await?;
    println!("form:  {} {}", response.status(), response.text().await?);

    let response = client.get(format!("{}/health", args.url)).send().await?;
    println!("empty: {} {}", response.status(), response.text().await?);

    Ok(())
}
