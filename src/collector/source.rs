//! Comment sources.

use crate::types::Comment;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

/// Producer of comments, pulled one at a time.
///
/// `Ok(None)` means the stream is exhausted. An `Err` means the source itself
/// is broken; the collector stops pulling and keeps what it has.
#[async_trait]
pub trait CommentSource: Send {
    async fn next_comment(&mut self) -> Result<Option<Comment>>;
}

/// Source over any iterator of comments.
pub struct IterSource<I> {
    iter: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = Comment>,
{
    pub fn new(comments: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            iter: comments.into_iter(),
        }
    }
}

#[async_trait]
impl<I> CommentSource for IterSource<I>
where
    I: Iterator<Item = Comment> + Send,
{
    async fn next_comment(&mut self) -> Result<Option<Comment>> {
        Ok(self.iter.next())
    }
}

/// Source over an async stream of comments.
pub struct StreamSource<S> {
    stream: S,
}

impl<S> StreamSource<S>
where
    S: Stream<Item = Result<Comment>> + Send + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl<S> CommentSource for StreamSource<S>
where
    S: Stream<Item = Result<Comment>> + Send + Unpin,
{
    async fn next_comment(&mut self) -> Result<Option<Comment>> {
        self.stream.next().await.transpose()
    }
}

/// Newline-delimited JSON comments, one `{"text": ..., "author": ...}` per line.
///
/// Blank lines are ignored. A line that is not a valid comment object, or not
/// valid UTF-8, is passed on as an unreadable comment so the batch processor
/// skips it and the following lines are still read.
pub struct JsonLinesSource<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
}

impl<R> JsonLinesSource<R>
where
    R: AsyncBufRead + Send + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
        }
    }
}

#[async_trait]
impl<R> CommentSource for JsonLinesSource<R>
where
    R: AsyncBufRead + Send + Unpin,
{
    async fn next_comment(&mut self) -> Result<Option<Comment>> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .await
                .map_err(|e| {
                    Error::source_with_context(
                        "failed to read comment line",
                        ErrorContext::new()
                            .with_details(e.to_string())
                            .with_source(format!("json_lines:{}", self.line_no + 1)),
                    )
                })?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            if self.buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return match serde_json::from_slice::<Comment>(&self.buf) {
                Ok(comment) => Ok(Some(comment)),
                Err(e) => {
                    debug!(line = self.line_no, error = %e, "undecodable comment line");
                    Ok(Some(Comment::unreadable()))
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_iter_source() {
        let mut source = IterSource::new(vec![Comment::new("a", "b")]);
        assert!(source.next_comment().await.unwrap().is_some());
        assert!(source.next_comment().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stream_source_propagates_errors() {
        let items = vec![
            Ok(Comment::new("a", "b")),
            Err(Error::source_with_context("gone", ErrorContext::new())),
        ];
        let mut source = StreamSource::new(futures::stream::iter(items));
        assert!(source.next_comment().await.unwrap().is_some());
        assert!(source.next_comment().await.is_err());
        assert!(source.next_comment().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_json_lines_source() {
        let input = concat!(
            "{\"text\":\"sent $5\",\"author\":\"a\"}\n",
            "\n",
            "not json at all\n",
            "{\"text\":\"no author\"}\n",
        );
        let mut source = JsonLinesSource::new(tokio::io::BufReader::new(input.as_bytes()));

        let first = source.next_comment().await.unwrap().unwrap();
        assert_eq!(first, Comment::new("sent $5", "a"));
        let second = source.next_comment().await.unwrap().unwrap();
        assert_eq!(second, Comment::unreadable());
        let third = source.next_comment().await.unwrap().unwrap();
        assert!(third.author.is_none());
        assert!(source.next_comment().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_json_lines_invalid_utf8_line_is_skipped() {
        let mut input = b"{\"text\":\"sent $5\",\"author\":\"a\"}\n".to_vec();
        input.extend_from_slice(b"{\"text\":\"\xff\xfe\"}\n");
        input.extend_from_slice(b"{\"text\":\"gave $7\",\"author\":\"c\"}\r\n");
        input.extend_from_slice(b"{\"text\":\"\xe2\x82\xac9 merci\"}");
        let mut source = JsonLinesSource::new(tokio::io::BufReader::new(&input[..]));

        assert_eq!(
            source.next_comment().await.unwrap().unwrap(),
            Comment::new("sent $5", "a")
        );
        assert_eq!(source.next_comment().await.unwrap().unwrap(), Comment::unreadable());
        assert_eq!(
            source.next_comment().await.unwrap().unwrap(),
            Comment::new("gave $7", "c")
        );
        let last = source.next_comment().await.unwrap().unwrap();
        assert_eq!(last.text.as_deref(), Some("€9 merci"));
        assert!(source.next_comment().await.unwrap().is_none());
    }
}
