//! Shrinking student output before it is stored in a debug bundle.

/// Keeps at most `max_bytes` of `text`, cut on a character boundary.
pub fn reduce_text(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut reduced = text[..end].to_string();
    reduced.push_str("\n...");
    reduced
}

const SOCKET_EXCEPTION_START: &str =
    "Exception ignored in: <bound method Socket.__del__ of <zmq.sugar.socket.Socket";

/// Drops the zmq socket finalizer noise that Python appends to stderr at interpreter exit,
/// from its first line to the end.
pub fn remove_socket_exception(stderr: &str) -> String {
    match stderr
        .split('\n')
        .position(|line| line.starts_with(SOCKET_EXCEPTION_START))
    {
        Some(start) => stderr.split('\n').take(start).collect::<Vec<_>>().join("\n"),
        None => stderr.to_string(),
    }
}

const STDERR_HEAD_LINES: usize = 10;
const STDERR_TAIL_LINES: usize = 10;

/// Keeps the first and last ten lines of `stderr`.
pub fn cut_stderr(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    if lines.len() <= STDERR_HEAD_LINES + STDERR_TAIL_LINES {
        return stderr.to_string();
    }
    let head = &lines[..STDERR_HEAD_LINES];
    let tail = &lines[lines.len() - STDERR_TAIL_LINES..];
    let mut cut = head.join("\n");
    cut.push_str("\n\t\t...\n");
    cut.push_str(&tail.join("\n"));
    cut
}
