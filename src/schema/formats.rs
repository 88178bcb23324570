//! String format checks for email addresses and URLs.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;

use regex::Regex;

const MAX_LOCAL_PART: usize = 64;
const MAX_DOMAIN: usize = 253;

// A regex that fails to build matches nothing, so the checks fail closed.

fn local_part_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*$").ok()
    })
    .as_ref()
}

fn domain_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$").ok()
    })
    .as_ref()
}

fn host_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
        )
        .ok()
    })
    .as_ref()
}

/// Returns the text after the `@` of an email-like string.
pub fn email_domain(value: &str) -> Option<&str> {
    value.split_once('@').map(|(_, domain)| domain)
}

/// Checks `local@domain` with a dotted, syntactically valid domain.
pub fn check_email(value: &str) -> Result<(), String> {
    let (local, domain) = value
        .split_once('@')
        .ok_or_else(|| "An email address must have an @-sign".to_string())?;

    if local.is_empty() {
        return Err("There must be something before the @-sign".into());
    }
    if local.len() > MAX_LOCAL_PART || !local_part_regex().is_some_and(|re| re.is_match(local)) {
        return Err(format!("The part before the @-sign is not valid: '{}'", local));
    }
    if domain.is_empty() {
        return Err("There must be something after the @-sign".into());
    }
    if domain.len() > MAX_DOMAIN || !domain_regex().is_some_and(|re| re.is_match(domain)) {
        return Err(format!("The domain name '{}' is not valid", domain));
    }
    Ok(())
}

/// Checks an absolute `http://` or `https://` URL with a valid host.
pub fn check_http_url(value: &str) -> Result<(), String> {
    if value.chars().any(char::is_whitespace) {
        return Err("URL must not contain whitespace".into());
    }

    let (scheme, rest) = value
        .split_once("://")
        .ok_or_else(|| "relative URL without a base".to_string())?;
    if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
        return Err(format!("URL scheme '{}' should be 'http' or 'https'", scheme));
    }

    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    let host_port = match authority.rsplit_once('@') {
        Some((_, host_port)) => host_port,
        None => authority,
    };
    if host_port.is_empty() {
        return Err("URL must have a host".into());
    }

    let (host, port) = split_host_port(host_port)?;
    if let Some(port) = port {
        port.parse::<u16>()
            .map_err(|_| format!("invalid port number '{}'", port))?;
    }

    let valid_host = if let Some(inner) = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        inner.parse::<Ipv6Addr>().is_ok()
    } else {
        host.parse::<Ipv4Addr>().is_ok() || host_regex().is_some_and(|re| re.is_match(host))
    };
    if !valid_host {
        return Err(format!("invalid host '{}'", host));
    }

    Ok(())
}

fn split_host_port(host_port: &str) -> Result<(&str, Option<&str>), String> {
    if host_port.starts_with('[') {
        let close = host_port
            .find(']')
            .ok_or_else(|| "unterminated IPv6 host".to_string())?;
        let (host, rest) = host_port.split_at(close + 1);
        return match rest.strip_prefix(':') {
            Some(port) => Ok((host, Some(port))),
            None if rest.is_empty() => Ok((host, None)),
            None => Err(format!("invalid host '{}'", host_port)),
        };
    }
    Ok(match host_port.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (host_port, None),
    })
}
