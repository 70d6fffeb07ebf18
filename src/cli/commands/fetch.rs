//! Fetch command - dispatch a fetch event and print the response

use super::{load_manifest, open_worker};
use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::{SwsyncError, SwsyncResult};
use crate::http::{Method, Request};
use crate::worker::{FetchOutcome, Origin};
use console::style;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

/// Execute the fetch command.
///
/// The response body goes to stdout (or `--output`); the status line goes
/// to stderr so the body can be piped.
pub async fn execute(args: FetchArgs, config: &Config) -> SwsyncResult<()> {
    let manifest = load_manifest(config).await?;
    let worker = open_worker(config, manifest).await?;
    let ctx = worker.context();

    let method = Method::parse(&args.method)
        .ok_or_else(|| SwsyncError::User(format!("Unsupported method: {}", args.method)))?;
    let url = resolve_target(&ctx.origin, &args.url)?;
    let request = Request::get(url).with_method(method);

    let (response, source) = match worker.handle_fetch(&request).await? {
        FetchOutcome::Respond { response, source } => (response, source.as_str()),
        FetchOutcome::Passthrough => {
            debug!("Not intercepted, fetching {} directly", request.url);
            (ctx.fetcher.fetch(&request).await?, "passthrough")
        }
    };

    let status = format!("{} {}", response.status, response.status_text);
    let status = if response.ok() {
        style(status).green()
    } else {
        style(status).yellow()
    };
    eprintln!("{} {} ({})", status, request.url, style(source).dim());

    match args.output {
        Some(path) => {
            fs::write(&path, &response.body)
                .await
                .map_err(|e| SwsyncError::io(format!("writing {}", path.display()), e))?;
            eprintln!("Wrote {} bytes to {}", response.body.len(), path.display());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(&response.body)
                .await
                .map_err(|e| SwsyncError::io("writing response body", e))?;
            stdout
                .flush()
                .await
                .map_err(|e| SwsyncError::io("writing response body", e))?;
        }
    }

    Ok(())
}

/// An absolute URL as given, anything else relative to the origin root
fn resolve_target(origin: &Origin, target: &str) -> SwsyncResult<Url> {
    match Url::parse(target) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            origin
                .root()
                .join(target)
                .map_err(|e| SwsyncError::InvalidUrl {
                    url: target.to_string(),
                    reason: e.to_string(),
                })
        }
        Err(e) => Err(SwsyncError::InvalidUrl {
            url: target.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_resolve_against_origin() {
        let origin = Origin::parse("http://localhost:8080").unwrap();
        assert_eq!(
            resolve_target(&origin, "main.dart.js").unwrap().as_str(),
            "http://localhost:8080/main.dart.js"
        );
        assert_eq!(
            resolve_target(&origin, "/assets/a.png?v=2").unwrap().as_str(),
            "http://localhost:8080/assets/a.png?v=2"
        );
        assert_eq!(
            resolve_target(&origin, "https://cdn.example.com/x.js")
                .unwrap()
                .as_str(),
            "https://cdn.example.com/x.js"
        );
    }
}
