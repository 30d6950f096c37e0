use std::sync::Mutex;
use std::time::Duration;

use salvo::prelude::*;
use salvo::server::ServerHandle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::OAuthError;

pub const CALLBACK_PATH: &str = "callback";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

type Outcome = Result<String, OAuthError>;

/// Decides what a single callback request means for the login attempt.
pub(crate) fn evaluate_callback(
    expected_state: &str,
    state: Option<&str>,
    error: Option<&str>,
    code: Option<&str>,
) -> Outcome {
    if !state.is_some_and(|state| constant_time_eq(state, expected_state)) {
        return Err(OAuthError::StateMismatch);
    }
    if let Some(error) = error.filter(|error| !error.is_empty()) {
        return Err(OAuthError::Rejected(error.to_string()));
    }
    code.filter(|code| !code.is_empty())
        .map(ToOwned::to_owned)
        .ok_or(OAuthError::MissingCode)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>slck</title></head>\n<body style=\"font-family: sans-serif; text-align: center; padding-top: 50px;\">\n<h1>{title}</h1>\n<p>{body}</p>\n</body>\n</html>\n"
    )
}

struct CallbackHandler {
    expected_state: String,
    outcome_tx: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl CallbackHandler {
    fn take_sender(&self) -> Option<oneshot::Sender<Outcome>> {
        match self.outcome_tx.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

#[handler]
impl CallbackHandler {
    async fn handle(&self, req: &mut Request, res: &mut Response) {
        let Some(outcome_tx) = self.take_sender() else {
            debug!("ignoring callback after the login attempt completed");
            res.status_code(StatusCode::GONE);
            res.render(Text::Html(page(
                "Already Handled",
                "This login attempt has already completed. You can close this window.",
            )));
            return;
        };

        let state = req.query::<String>("state");
        let error = req.query::<String>("error");
        let code = req.query::<String>("code");
        let outcome = evaluate_callback(
            &self.expected_state,
            state.as_deref(),
            error.as_deref(),
            code.as_deref(),
        );

        match &outcome {
            Ok(_) => {
                res.render(Text::Html(page(
                    "Authentication Successful",
                    "You can close this window and return to the terminal.",
                )));
            }
            Err(err) => {
                warn!("oauth callback rejected: {}", err);
                res.status_code(StatusCode::BAD_REQUEST);
                res.render(Text::Html(page(
                    "Authentication Failed",
                    &format!("{err}. Please return to the terminal and try again."),
                )));
            }
        }

        let _ = outcome_tx.send(outcome);
    }
}

/// Loopback listener that captures exactly one OAuth redirect.
pub(crate) struct CallbackServer {
    port: u16,
    handle: ServerHandle,
    task: JoinHandle<()>,
    outcome_rx: oneshot::Receiver<Outcome>,
}

impl CallbackServer {
    pub async fn start(port: u16, expected_state: String) -> Result<Self, OAuthError> {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let handler = CallbackHandler {
            expected_state,
            outcome_tx: Mutex::new(Some(outcome_tx)),
        };
        let router = Router::with_path(CALLBACK_PATH).get(handler);

        let acceptor = TcpListener::new(format!("127.0.0.1:{port}"))
            .try_bind()
            .await
            .map_err(|err| OAuthError::Listener {
                port,
                message: err.to_string(),
            })?;
        let server = Server::new(acceptor);
        let handle = server.handle();
        let task = tokio::spawn(server.serve(router));
        info!("oauth callback listener started on port {}", port);

        Ok(Self {
            port,
            handle,
            task,
            outcome_rx,
        })
    }

    /// Waits for the first callback or the deadline, then stops the listener.
    pub async fn wait(self, deadline: Duration) -> Outcome {
        let outcome = match tokio::time::timeout(deadline, self.outcome_rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(OAuthError::Listener {
                port: self.port,
                message: "callback handler dropped".to_string(),
            }),
            Err(_) => Err(OAuthError::Timeout(deadline)),
        };

        self.handle.stop_graceful(Some(SHUTDOWN_GRACE));
        if let Err(err) = self.task.await {
            warn!("oauth callback listener task failed: {}", err);
        }
        info!("oauth callback listener stopped");
        outcome
    }
}

#[cfg(test)]
pub(crate) fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(Some("abc"), None, Some("code-1"), Ok("code-1") ; "matching state with code")]
    #[test_case(Some("xyz"), None, Some("code-1"), Err("state") ; "state mismatch")]
    #[test_case(None, None, Some("code-1"), Err("state") ; "missing state")]
    #[test_case(Some("xyz"), Some("access_denied"), None, Err("state") ; "state checked before error")]
    #[test_case(Some("abc"), Some("access_denied"), None, Err("access_denied") ; "provider error")]
    #[test_case(Some("abc"), None, None, Err("code") ; "missing code")]
    fn callback_evaluation(
        state: Option<&str>,
        error: Option<&str>,
        code: Option<&str>,
        expected: Result<&str, &str>,
    ) {
        let outcome = evaluate_callback("abc", state, error, code);
        match (outcome, expected) {
            (Ok(code), Ok(want)) => assert_eq!(code, want),
            (Err(err), Err(fragment)) => assert!(err.to_string().contains(fragment), "{err}"),
            (outcome, expected) => panic!("got {outcome:?}, expected {expected:?}"),
        }
    }

    #[tokio::test]
    async fn mismatched_state_fails_the_attempt() {
        let port = free_port();
        let server = CallbackServer::start(port, "abc".to_string()).await.unwrap();

        let response = reqwest::get(format!(
            "http://127.0.0.1:{port}/callback?state=xyz&code=stolen"
        ))
        .await
        .unwrap();
        assert_eq!(response.status().as_u16(), 400);
        assert!(response.text().await.unwrap().contains("Authentication Failed"));

        let outcome = server.wait(Duration::from_secs(5)).await;
        assert!(matches!(outcome, Err(OAuthError::StateMismatch)));
    }

    #[tokio::test]
    async fn valid_callback_yields_code() {
        let port = free_port();
        let server = CallbackServer::start(port, "abc".to_string()).await.unwrap();

        let response = reqwest::get(format!(
            "http://127.0.0.1:{port}/callback?state=abc&code=the-code"
        ))
        .await
        .unwrap();
        assert!(response.status().is_success());
        assert!(
            response
                .text()
                .await
                .unwrap()
                .contains("Authentication Successful")
        );

        let code = server.wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(code, "the-code");
    }

    #[tokio::test]
    async fn no_callback_times_out() {
        let server = CallbackServer::start(free_port(), "abc".to_string())
            .await
            .unwrap();
        let outcome = server.wait(Duration::from_millis(100)).await;
        assert!(matches!(outcome, Err(OAuthError::Timeout(_))));
    }

    #[tokio::test]
    async fn busy_port_is_a_listener_error() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let err = CallbackServer::start(port, "abc".to_string())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, OAuthError::Listener { .. }));
    }
}
