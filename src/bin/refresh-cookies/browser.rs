//! The google sign in flow, driven through WebDriver.

use std::time::Duration;

use fantoccini::cookies::Cookie;
use fantoccini::Client;
use fantoccini::ClientBuilder;
use fantoccini::Locator;
use serde_json::json;

use crate::error::RefreshError;
use crate::Args;

const SIGN_IN_URL: &str = "https://accounts.google.com/signin";
const YOUTUBE_URL: &str = "https://www.youtube.com/";

/// Headless chrome without images or stylesheets.
fn chrome_capabilities() -> serde_json::Map<String, serde_json::Value> {
    let caps = json!({
        "browserName": "chrome",
        "goog:chromeOptions": {
            "args": [
                "--headless=new",
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--disable-gpu",
                "--window-size=1920,1080",
                "--user-agent=Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            ],
            "prefs": {
                "profile.managed_default_content_settings.images": 2,
                "profile.managed_default_content_settings.stylesheets": 2,
            },
        },
    });

    match caps {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

/// Sign in and return every cookie the browser holds for youtube and google.
/// The browser session is closed whatever happens.
pub async fn login(args: &Args) -> Result<Vec<Cookie<'static>>, RefreshError> {
    tracing::info!("Connecting to webdriver at {}.", args.webdriver);
    let client = ClientBuilder::native()
        .capabilities(chrome_capabilities())
        .connect(&args.webdriver)
        .await?;

    let result = sign_in(&client, args).await;

    if let Err(e) = client.close().await {
        tracing::warn!("Failed to close the browser session: {e}");
    } else {
        tracing::info!("Browser session closed.");
    }
    result
}

#[allow(clippy::missing_docs_in_private_items)]
async fn sign_in(client: &Client, args: &Args) -> Result<Vec<Cookie<'static>>, RefreshError> {
    let timeout = args.timeout();

    tracing::info!("Signing in.");
    client.goto(SIGN_IN_URL).await?;

    let email = client
        .wait()
        .at_most(timeout)
        .for_element(Locator::Id("identifierId"))
        .await?;
    email.send_keys(&args.email).await?;
    client.find(Locator::Id("identifierNext")).await?.click().await?;

    let password = client
        .wait()
        .at_most(timeout)
        .for_element(Locator::Css("input[name=\"Passwd\"], input[name=\"password\"]"))
        .await?;
    // The field shows up before it accepts input.
    tokio::time::sleep(Duration::from_secs(2)).await;
    password.send_keys(&args.password).await?;
    client.find(Locator::Id("passwordNext")).await?.click().await?;

    wait_for_redirect(client, timeout).await?;

    // Make sure youtube sets its own cookies.
    client.goto(YOUTUBE_URL).await?;
    client
        .wait()
        .at_most(timeout)
        .for_element(Locator::Css("body"))
        .await?;
    tracing::info!("Signed in.");

    let mut cookies = client.get_all_cookies().await?;
    client.goto(SIGN_IN_URL).await?;
    cookies.extend(client.get_all_cookies().await?);
    Ok(cookies)
}

/// Wait until google sends the browser to the account page or youtube.
async fn wait_for_redirect(client: &Client, timeout: Duration) -> Result<(), RefreshError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let url = client.current_url().await?;
        let host = url.host_str().unwrap_or_default();
        if host.ends_with("myaccount.google.com") || host.ends_with("youtube.com") {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(RefreshError::LoginTimedOut {
                secs: timeout.as_secs(),
            });
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}
