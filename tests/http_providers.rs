//! Built-in providers against a local HTTP stub, no internet needed.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use wxlocate::location::{
    Deadline, HttpClient, IpApiCom, IpapiCo, IpwhoIs, LocateError, LocateOptions, LocationResolver,
    Provider, ProviderError,
};

struct Canned {
    status: u16,
    body: &'static str,
    delay: Duration,
}

impl Canned {
    fn ok(body: &'static str) -> Self {
        Self { status: 200, body, delay: Duration::ZERO }
    }
}

/// Serve one canned response per connection; returns the base URL and the raw requests.
fn serve(responses: Vec<Canned>) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/json/", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for canned in responses {
            let Ok((mut stream, _)) = listener.accept() else { return };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());

            thread::sleep(canned.delay);
            let response = format!(
                "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                canned.status,
                canned.body.len(),
                canned.body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    (url, rx)
}

fn client() -> HttpClient {
    HttpClient::new("wxlocate-test/1.0", Duration::from_secs(2))
}

fn soon() -> Deadline {
    Deadline::after(Duration::from_secs(2))
}

#[test]
fn test_ipwho_is_over_http_sends_user_agent() {
    let (url, requests) = serve(vec![Canned::ok(
        r#"{"success":true,"city":"Oslo","region":"Oslo","country":"Norway","latitude":59.91,"longitude":10.75}"#,
    )]);
    let loc = IpwhoIs::with_endpoint(url).lookup(soon(), &client()).unwrap();
    assert_eq!(loc.city, "Oslo");
    assert_eq!(loc.source, "ipwho.is");

    let raw = requests.recv_timeout(Duration::from_secs(1)).unwrap().to_lowercase();
    assert!(raw.starts_with("get /json/"));
    assert!(raw.contains("user-agent: wxlocate-test/1.0"));
}

#[test]
fn test_non_success_status() {
    let (url, _requests) = serve(vec![Canned {
        status: 429,
        body: r#"{"error":true,"reason":"RateLimited"}"#,
        delay: Duration::ZERO,
    }]);
    let err = IpapiCo::with_endpoint(url).lookup(soon(), &client()).unwrap_err();
    assert!(matches!(err, ProviderError::Status(429)));
}

#[test]
fn test_logical_failure_keeps_message() {
    let (url, _requests) = serve(vec![Canned::ok(r#"{"status":"fail","message":"private range"}"#)]);
    let err = IpApiCom::with_endpoint(url).lookup(soon(), &client()).unwrap_err();
    match err {
        ProviderError::Rejected(msg) => assert_eq!(msg, "private range"),
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[test]
fn test_malformed_body() {
    let (url, _requests) = serve(vec![Canned::ok("<html>gateway error</html>")]);
    let err = IpwhoIs::with_endpoint(url).lookup(soon(), &client()).unwrap_err();
    assert!(matches!(err, ProviderError::Decode(_)));
}

#[test]
fn test_connection_refused() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let err = IpwhoIs::with_endpoint(format!("http://{}/", addr))
        .lookup(soon(), &client())
        .unwrap_err();
    assert!(matches!(err, ProviderError::Transport(_)));
}

#[test]
fn test_slow_server_cut_off_by_deadline() {
    let (url, _requests) = serve(vec![Canned {
        status: 200,
        body: r#"{"success":true,"city":"Late"}"#,
        delay: Duration::from_secs(3),
    }]);
    let started = Instant::now();
    let err = IpwhoIs::with_endpoint(url)
        .lookup(Deadline::after(Duration::from_millis(150)), &client())
        .unwrap_err();
    assert!(matches!(err, ProviderError::Transport(_)));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_race_over_http_ranks_by_completeness() {
    let (sparse, _r1) = serve(vec![Canned::ok(r#"{"country_name":"Germany"}"#)]);
    let (partial, _r2) = serve(vec![Canned::ok(
        r#"{"status":"success","country":"Germany","city":"Berlin","lat":52.52,"lon":13.41}"#,
    )]);
    let (full, _r3) = serve(vec![Canned {
        status: 200,
        body: r#"{"success":true,"city":"Berlin","region":"Land Berlin","country":"Germany","latitude":52.52,"longitude":13.41}"#,
        delay: Duration::from_millis(100),
    }]);

    let resolver = LocationResolver::with_providers(vec![
        Arc::new(IpapiCo::with_endpoint(sparse)) as Arc<dyn Provider>,
        Arc::new(IpApiCom::with_endpoint(partial)),
        Arc::new(IpwhoIs::with_endpoint(full)),
    ]);
    let opts = LocateOptions::default()
        .prefer_fastest(false)
        .overall_timeout(Duration::from_secs(2))
        .per_call_timeout(Duration::from_secs(2));

    let loc = resolver.locate(Deadline::after(Duration::from_secs(5)), opts).await.unwrap();
    assert_eq!(loc.source, "ipwho.is");
    assert_eq!(loc.region, "Land Berlin");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_race_over_http_all_failing() {
    let (a, _r1) = serve(vec![Canned { status: 500, body: "{}", delay: Duration::ZERO }]);
    let (b, _r2) = serve(vec![Canned::ok(r#"{"success":false}"#)]);

    let resolver = LocationResolver::with_providers(vec![
        Arc::new(IpapiCo::with_endpoint(a)) as Arc<dyn Provider>,
        Arc::new(IpwhoIs::with_endpoint(b)),
    ]);
    let err = resolver
        .locate(Deadline::after(Duration::from_secs(5)), LocateOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, LocateError::Exhausted);
}
