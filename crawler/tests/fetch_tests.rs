use crawler::{Fetch, FetchConfig, FetchError, HttpFetcher};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use url::Url;

/// Serves canned responses on an ephemeral port, one thread per connection.
fn serve() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            thread::spawn(move || respond(stream));
        }
    });
    base
}

fn respond(mut stream: TcpStream) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
            break;
        }
    }
    let path = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();
    stream.write_all(route(&path).as_bytes()).unwrap();
}

fn reply(status: &str, headers: &[(&str, &str)], body: &str, with_length: bool) -> String {
    let mut out = format!("HTTP/1.1 {status}\r\nConnection: close\r\n");
    for (name, value) in headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    if with_length {
        out.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    out.push_str("\r\n");
    out.push_str(body);
    out
}

fn route(path: &str) -> String {
    let html = [("Content-Type", "text/html; charset=utf-8")];
    if let Some(hops) = path.strip_prefix("/hops/").and_then(|n| n.parse::<usize>().ok()) {
        return if hops == 0 {
            reply("200 OK", &html, "<p>landed</p>", true)
        } else {
            let next = format!("/hops/{}", hops - 1);
            reply("302 Found", &[("Location", next.as_str())], "", true)
        };
    }
    match path {
        "/page" => reply("200 OK", &html, "<p>hello</p>", true),
        "/plain" => reply("200 OK", &[("Content-Type", "text/plain")], "hello", true),
        "/big" => reply("200 OK", &html, &"a".repeat(100), true),
        "/unsized" => reply("200 OK", &html, &"a".repeat(100), false),
        "/unsized-small" => reply("200 OK", &html, "<p>tiny</p>", false),
        "/dead-end" => reply("301 Moved Permanently", &[], "", true),
        _ => reply("404 Not Found", &html, "", true),
    }
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(&FetchConfig { max_bytes: 64, ..FetchConfig::default() }).unwrap()
}

fn get(base: &Url, path: &str) -> Result<String, FetchError> {
    fetcher().fetch(&base.join(path).unwrap())
}

#[test]
fn returns_html_bodies() {
    let base = serve();
    assert_eq!(get(&base, "/page").unwrap(), "<p>hello</p>");
    assert_eq!(get(&base, "/unsized-small").unwrap(), "<p>tiny</p>");
}

#[test]
fn follows_at_most_three_redirects() {
    let base = serve();
    assert_eq!(get(&base, "/hops/3").unwrap(), "<p>landed</p>");
    assert!(matches!(get(&base, "/hops/4"), Err(FetchError::TooManyRedirects(3))));
    assert!(matches!(get(&base, "/dead-end"), Err(FetchError::Status(301))));
}

#[test]
fn rejects_other_statuses_and_content_types() {
    let base = serve();
    assert!(matches!(get(&base, "/missing"), Err(FetchError::Status(404))));
    assert!(matches!(get(&base, "/plain"), Err(FetchError::NotHtml(ct)) if ct == "text/plain"));
}

#[test]
fn rejects_oversized_bodies() {
    let base = serve();
    assert!(matches!(get(&base, "/big"), Err(FetchError::TooLarge(len)) if len > 64));
    assert!(matches!(get(&base, "/unsized"), Err(FetchError::TooLarge(65))));
}
