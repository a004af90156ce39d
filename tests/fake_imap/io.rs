//! Write helpers shared by the command handlers.
//!
//! Every write is flushed immediately so the client sees each response
//! line as soon as the handler produces it.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Write a protocol line and flush.
pub async fn write_line<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut BufReader<S>,
    line: &str,
) -> std::io::Result<()> {
    stream.get_mut().write_all(line.as_bytes()).await?;
    stream.get_mut().flush().await
}

/// Write a literal payload and flush.
pub async fn write_bytes<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut BufReader<S>,
    data: &[u8],
) -> std::io::Result<()> {
    stream.get_mut().write_all(data).await?;
    stream.get_mut().flush().await
}

/// In-memory pipe for handler unit tests: the handler writes to the
/// returned server end, [`read_all`] collects what the client saw.
#[cfg(test)]
pub fn pipe() -> (tokio::io::DuplexStream, BufReader<tokio::io::DuplexStream>) {
    let (client, server) = tokio::io::duplex(8192);
    (client, BufReader::new(server))
}

#[cfg(test)]
pub async fn read_all(client: tokio::io::DuplexStream) -> String {
    let mut buf = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
        .await
        .unwrap();
    String::from_utf8(buf).unwrap()
}
