use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time;
use tracing::debug;
use url::Url;

use crate::error::{AppError, AppResult};

const LOOPBACK_HOST: &str = "127.0.0.1";
const REDIRECT_PATH: &str = "/";
const MAX_REQUEST_BYTES: usize = 8192;

/// One-shot HTTP listener on an ephemeral loopback port that receives the
/// browser redirect at the end of the consent screen.
#[derive(Debug)]
pub struct LoopbackServer {
    listener: TcpListener,
    redirect_uri: String,
}

/// What a single inbound request on the loopback port turned out to be.
#[derive(Debug)]
enum Incoming {
    Code(String),
    Failed(AppError),
    Stray(&'static str, &'static str),
}

impl LoopbackServer {
    pub async fn bind() -> AppResult<Self> {
        let listener = TcpListener::bind((LOOPBACK_HOST, 0)).await.map_err(|err| {
            AppError::Auth(format!(
                "could not listen for the oauth redirect on {LOOPBACK_HOST}: {err}"
            ))
        })?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            listener,
            redirect_uri: format!("http://{LOOPBACK_HOST}:{port}{REDIRECT_PATH}"),
        })
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Accepts connections until one carries the authorization code for
    /// `state`. Requests for other paths are answered and ignored.
    pub async fn wait_for_code(self, state: &str, timeout: Duration) -> AppResult<String> {
        let accept_loop = async {
            loop {
                let (mut stream, _) = self.listener.accept().await?;
                let Some(target) = read_request_target(&mut stream).await? else {
                    continue;
                };

                match classify(&target, state) {
                    Incoming::Code(code) => {
                        respond(
                            &mut stream,
                            "200 OK",
                            "Gmail authorization complete. You can close this tab.",
                        )
                        .await?;
                        return Ok(code);
                    }
                    Incoming::Failed(err) => {
                        let _ = respond(&mut stream, "400 Bad Request", &err.to_string()).await;
                        return Err(err);
                    }
                    Incoming::Stray(status, message) => {
                        debug!(%target, "ignoring request on the oauth redirect port");
                        let _ = respond(&mut stream, status, message).await;
                    }
                }
            }
        };

        time::timeout(timeout, accept_loop)
            .await
            .map_err(|_| AppError::Auth("timed out waiting for the oauth redirect".to_string()))?
    }
}

/// `Some(target)` for GET requests; other methods get a 405 and `None`.
async fn read_request_target(stream: &mut TcpStream) -> AppResult<Option<String>> {
    let mut buf = vec![0_u8; MAX_REQUEST_BYTES];
    let read = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..read]);

    let mut request_line = request.lines().next().unwrap_or_default().split_whitespace();
    match (request_line.next(), request_line.next()) {
        (Some("GET"), Some(target)) => Ok(Some(target.to_string())),
        (Some(_), _) => {
            let _ = respond(stream, "405 Method Not Allowed", "only GET is accepted").await;
            Ok(None)
        }
        _ => Ok(None),
    }
}

fn classify(target: &str, expected_state: &str) -> Incoming {
    let url = match Url::parse(&format!("http://{LOOPBACK_HOST}{target}")) {
        Ok(url) => url,
        Err(_) => return Incoming::Stray("400 Bad Request", "malformed request"),
    };
    if url.path() != REDIRECT_PATH {
        return Incoming::Stray("404 Not Found", "not found");
    }

    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    if let Some(error) = param("error") {
        let description =
            param("error_description").unwrap_or_else(|| "no description".to_string());
        return Incoming::Failed(AppError::Auth(format!(
            "authorization was denied: {error} ({description})"
        )));
    }

    match (param("state"), param("code")) {
        (Some(state), _) if state != expected_state => Incoming::Failed(AppError::Auth(
            "oauth state did not match; refusing the redirect".to_string(),
        )),
        (Some(_), Some(code)) => Incoming::Code(code),
        (None, _) => Incoming::Failed(AppError::Auth(
            "oauth redirect is missing the state parameter".to_string(),
        )),
        (Some(_), None) => Incoming::Failed(AppError::Auth(
            "oauth redirect is missing the code parameter".to_string(),
        )),
    }
}

async fn respond(stream: &mut TcpStream, status: &str, message: &str) -> AppResult<()> {
    let body = format!(
        "<!doctype html><html><body><p>{}</p></body></html>",
        html_escape::encode_text(message)
    );
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}
