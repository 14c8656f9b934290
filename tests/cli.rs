use std::{
    io::{Read, Write},
    net::{TcpListener, TcpStream},
    path::{Path, PathBuf},
    process::{Command, Output},
    time::{Duration, Instant},
};

fn bookbrowser_bin() -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Ok(bin) = std::env::var("CARGO_BIN_EXE_bookbrowser") {
        return Ok(PathBuf::from(bin));
    }

    let mut path = std::env::current_exe()?;
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("bookbrowser");

    if cfg!(windows) {
        path.set_extension("exe");
    }

    Ok(path)
}

fn run(args: &[&str]) -> Result<Output, Box<dyn std::error::Error>> {
    let output = Command::new(bookbrowser_bin()?)
        .args(args)
        .env_remove("BOOKBROWSER_LOG")
        .env("NO_COLOR", "1")
        .output()?;
    Ok(output)
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn free_port() -> Result<u16, Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

fn temp_entries(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| {
                    e.file_name().to_string_lossy().starts_with("bookbrowser")
                })
                .map(|e| e.path())
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn version_flag_exits_zero() -> Result<(), Box<dyn std::error::Error>> {
    let output = run(&["--version"])?;
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("bookbrowser "));
    Ok(())
}

#[test]
fn help_flag_exits_one() -> Result<(), Box<dyn std::error::Error>> {
    let output = run(&["-h"])?;
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("--bookdir"));
    Ok(())
}

#[test]
fn positional_argument_is_rejected() -> Result<(), Box<dyn std::error::Error>>
{
    let output = run(&["stray"])?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn missing_book_dir_is_fatal() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let missing = tmp.path().join("missing");
    let output = run(&[
        "-b",
        missing.to_str().unwrap(),
        "-t",
        tmp.path().to_str().unwrap(),
    ])?;

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("does not exist"));
    Ok(())
}

#[test]
fn empty_library_is_fatal() -> Result<(), Box<dyn std::error::Error>> {
    let books = tempfile::tempdir()?;
    let data = tempfile::tempdir()?;
    std::fs::write(books.path().join("notes.txt"), "not a book")?;

    let output = run(&[
        "-b",
        books.path().to_str().unwrap(),
        "-t",
        data.path().to_str().unwrap(),
        "-a",
        "127.0.0.1:0",
    ])?;

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("no books found"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn sigterm_removes_temporary_data_dir() -> Result<(), Box<dyn std::error::Error>>
{
    let books = tempfile::tempdir()?;
    let scratch = tempfile::tempdir()?;
    std::fs::write(books.path().join("Ann Leckie - Provenance.epub"), "x")?;
    let port = free_port()?;

    let mut child = Command::new(bookbrowser_bin()?)
        .args(["-b", books.path().to_str().unwrap()])
        .args(["-a", &format!("127.0.0.1:{port}")])
        .env("TMPDIR", scratch.path())
        .env_remove("BOOKBROWSER_LOG")
        .spawn()?;

    wait_until(&mut child, "server never started listening", || {
        TcpStream::connect(("127.0.0.1", port)).is_ok()
    });
    assert_eq!(temp_entries(scratch.path()).len(), 1);

    send_signal(&child, "-TERM")?;

    let status = child.wait()?;
    assert!(status.success());
    assert!(temp_entries(scratch.path()).is_empty());
    Ok(())
}

#[cfg(unix)]
#[test]
fn sigusr1_reindexes_while_serving() -> Result<(), Box<dyn std::error::Error>>
{
    let books = tempfile::tempdir()?;
    let data = tempfile::tempdir()?;
    std::fs::write(books.path().join("Ann Leckie - Provenance.epub"), "x")?;
    let port = free_port()?;

    let mut child = Command::new(bookbrowser_bin()?)
        .args(["-b", books.path().to_str().unwrap()])
        .args(["-t", data.path().to_str().unwrap()])
        .args(["-a", &format!("127.0.0.1:{port}")])
        .env_remove("BOOKBROWSER_LOG")
        .spawn()?;

    wait_until(&mut child, "initial index never finished", || {
        book_count(port) == Some(1)
    });

    std::fs::write(books.path().join("Iain Banks - Excession.pdf"), "x")?;
    send_signal(&child, "-USR1")?;

    wait_until(&mut child, "reindex never picked up the new book", || {
        book_count(port) == Some(2)
    });

    send_signal(&child, "-TERM")?;
    let status = child.wait()?;
    assert!(status.success());
    Ok(())
}

/// Poll `ready` for up to 20 seconds, killing the child on timeout.
#[cfg(unix)]
fn wait_until(
    child: &mut std::process::Child,
    failure: &str,
    mut ready: impl FnMut() -> bool,
) {
    let deadline = Instant::now() + Duration::from_secs(20);
    while !ready() {
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("{failure}");
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

#[cfg(unix)]
fn send_signal(
    child: &std::process::Child,
    signal: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = Command::new("kill")
        .args([signal, &child.id().to_string()])
        .status()?;
    assert!(status.success());
    Ok(())
}

/// The `books` field of `/api/status`, or `None` while the server is not
/// answering.
#[cfg(unix)]
fn book_count(port: u16) -> Option<u64> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).ok()?;
    stream
        .write_all(
            b"GET /api/status HTTP/1.1\r\nHost: localhost\r\n\
              Connection: close\r\n\r\n",
        )
        .ok()?;
    let mut response = String::new();
    stream.read_to_string(&mut response).ok()?;

    let (head, body) = response.split_once("\r\n\r\n")?;
    if !head.starts_with("HTTP/1.1 200") {
        return None;
    }
    let status: serde_json::Value = serde_json::from_str(body).ok()?;
    status["books"].as_u64()
}
