use std::path::Path;

use reqwest::Url;

use crate::error::CoreError;

/// Resolve basic-auth credentials.
///
/// Precedence: explicit `user` + `pass`, then a cookie file holding
/// `username:password`, then no auth.
pub(crate) fn resolve_auth(
    user: Option<&str>,
    pass: Option<&str>,
    cookie_file: Option<&Path>,
) -> Result<Option<(String, String)>, CoreError> {
    match (user, pass) {
        (Some(u), Some(p)) => return Ok(Some((u.to_owned(), p.to_owned()))),
        (Some(_), None) | (None, Some(_)) => {
            return Err(CoreError::Config(
                "both rpc user and rpc pass must be set together".to_owned(),
            ));
        }
        (None, None) => {}
    }

    let Some(cookie_file) = cookie_file else {
        return Ok(None);
    };

    let content = std::fs::read_to_string(cookie_file).map_err(|e| {
        CoreError::Config(format!(
            "failed to read rpc cookie file {}: {e}",
            cookie_file.display()
        ))
    })?;
    let line = content
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .ok_or_else(|| {
            CoreError::Config(format!("rpc cookie file {} is empty", cookie_file.display()))
        })?;

    let (cookie_user, cookie_pass) = line.split_once(':').ok_or_else(|| {
        CoreError::Config(format!(
            "rpc cookie file {} must contain `username:password`",
            cookie_file.display()
        ))
    })?;
    if cookie_user.is_empty() || cookie_pass.is_empty() {
        return Err(CoreError::Config(format!(
            "rpc cookie file {} must contain non-empty `username:password`",
            cookie_file.display()
        )));
    }

    Ok(Some((cookie_user.to_owned(), cookie_pass.to_owned())))
}

/// Parse `connection` and require one of `schemes`.
pub(crate) fn parse_connection(connection: &str, schemes: &[&str]) -> Result<Url, CoreError> {
    let parsed = Url::parse(connection).map_err(|e| {
        CoreError::Config(format!(
            "invalid connection `{connection}`: expected {} URL ({e})",
            schemes.join("/")
        ))
    })?;
    if schemes.contains(&parsed.scheme()) {
        Ok(parsed)
    } else {
        Err(CoreError::Config(format!(
            "unsupported connection scheme `{}`; expected {}",
            parsed.scheme(),
            schemes.join(" or ")
        )))
    }
}
