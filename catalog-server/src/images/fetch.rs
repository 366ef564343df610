//! Image source fetching

use super::ImageError;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where an image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Remote(String),
    Local(PathBuf),
}

impl ImageSource {
    /// `http(s)://` origins are remote; anything else is a file path,
    /// resolved against `root` when relative
    pub fn parse(origin: &str, root: Option<&Path>) -> Self {
        let lower = origin.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return ImageSource::Remote(origin.to_string());
        }
        let path = Path::new(origin);
        match root {
            Some(root) if path.is_relative() => ImageSource::Local(root.join(path)),
            _ => ImageSource::Local(path.to_path_buf()),
        }
    }

    /// Last path segment, without query or fragment
    pub fn basename(&self) -> String {
        match self {
            ImageSource::Remote(url) => {
                let path = url.split(['?', '#']).next().unwrap_or(url);
                path.trim_end_matches('/')
                    .rsplit('/')
                    .next()
                    .unwrap_or(path)
                    .to_string()
            }
            ImageSource::Local(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }

    /// Lowercased file extension, used as a decode hint
    pub fn extension(&self) -> Option<String> {
        let name = self.basename();
        let (_, ext) = name.rsplit_once('.')?;
        (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
    }

    /// Read the whole payload within `timeout`, rejecting anything over `max_bytes`
    pub async fn fetch(
        &self,
        http: &reqwest::Client,
        timeout: Duration,
        max_bytes: usize,
    ) -> Result<Vec<u8>, ImageError> {
        let bytes = match tokio::time::timeout(timeout, self.read(http, max_bytes)).await {
            Ok(result) => result?,
            Err(_) => return Err(ImageError::Timeout(timeout)),
        };
        if bytes.len() > max_bytes {
            return Err(ImageError::TooLarge {
                size: bytes.len(),
                limit: max_bytes,
            });
        }
        Ok(bytes)
    }

    async fn read(&self, http: &reqwest::Client, max_bytes: usize) -> Result<Vec<u8>, ImageError> {
        match self {
            ImageSource::Remote(url) => {
                let mut response = http
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| ImageError::Fetch(e.to_string()))?;
                if let Some(len) = response.content_length()
                    && len as usize > max_bytes
                {
                    return Err(ImageError::TooLarge {
                        size: len as usize,
                        limit: max_bytes,
                    });
                }
                let mut body = Vec::new();
                while let Some(chunk) = response
                    .chunk()
                    .await
                    .map_err(|e| ImageError::Fetch(e.to_string()))?
                {
                    // Unannounced or lying lengths stop at the limit
                    if body.len() + chunk.len() > max_bytes {
                        return Err(ImageError::TooLarge {
                            size: body.len() + chunk.len(),
                            limit: max_bytes,
                        });
                    }
                    body.extend_from_slice(&chunk);
                }
                Ok(body)
            }
            ImageSource::Local(path) => tokio::fs::read(path)
                .await
                .map_err(|e| ImageError::Fetch(format!("{}: {e}", path.display()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_basename() {
        let remote = ImageSource::parse("https://cdn.example.com/img/a.PNG?v=2", None);
        assert!(matches!(remote, ImageSource::Remote(_)));
        assert_eq!(remote.basename(), "a.PNG");
        assert_eq!(remote.extension().as_deref(), Some("png"));

        let local = ImageSource::parse("photos/b.jpg", Some(Path::new("/srv/import")));
        assert_eq!(local, ImageSource::Local(PathBuf::from("/srv/import/photos/b.jpg")));
        assert_eq!(local.basename(), "b.jpg");

        let absolute = ImageSource::parse("/tmp/c", Some(Path::new("/srv")));
        assert_eq!(absolute, ImageSource::Local(PathBuf::from("/tmp/c")));
        assert_eq!(absolute.extension(), None);
    }

    #[tokio::test]
    async fn test_local_fetch_limits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.bin");
        std::fs::write(&path, vec![0u8; 64]).unwrap();
        let source = ImageSource::Local(path);
        let http = reqwest::Client::new();

        let bytes = source.fetch(&http, Duration::from_secs(5), 1024).await.unwrap();
        assert_eq!(bytes.len(), 64);

        let err = source.fetch(&http, Duration::from_secs(5), 16).await.unwrap_err();
        assert!(matches!(err, ImageError::TooLarge { size: 64, limit: 16 }));

        let missing = ImageSource::Local(dir.path().join("nope.png"));
        let err = missing.fetch(&http, Duration::from_secs(5), 1024).await.unwrap_err();
        assert!(matches!(err, ImageError::Fetch(_)));
    }

    /// Serve `body` once, without a Content-Length, closing the connection after it
    async fn serve_unsized(body: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/big.png")
    }

    #[tokio::test]
    async fn test_remote_body_without_length_is_capped() {
        let http = reqwest::Client::new();

        let url = serve_unsized(vec![7u8; 64 * 1024]).await;
        let err = ImageSource::Remote(url)
            .fetch(&http, Duration::from_secs(5), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::TooLarge { limit: 1024, .. }));

        let url = serve_unsized(vec![7u8; 100]).await;
        let bytes = ImageSource::Remote(url)
            .fetch(&http, Duration::from_secs(5), 1024)
            .await
            .unwrap();
        assert_eq!(bytes.len(), 100);
    }
}
