use crate::errors::ParseError;

/// Validate a port number read from an untyped source.
///
/// Ports live in `[0, 65535]`; anything else is reported with the offending
/// value rather than silently truncated.
pub fn port_from_i64(value: i64) -> Result<u16, ParseError> {
    if !(0..=65535).contains(&value) {
        return Err(ParseError::PortOutOfRange(value));
    }
    Ok(value as u16)
}

/// Parse a `host:port` pair.
///
/// IPv6 literals use the usual bracket syntax (`[::1]:8888`); colons inside
/// the brackets are ignored and the brackets are kept in the returned host so
/// it can be spliced straight into a URL.
pub fn parse_hostport(hostport: &str) -> Result<(String, u16), ParseError> {
    let search_from = hostport.find(']').map(|idx| idx + 1).unwrap_or(0);
    let colon_idx = hostport[search_from..]
        .find(':')
        .map(|idx| idx + search_from)
        .ok_or_else(|| ParseError::MissingPort(hostport.to_owned()))?;
    let host = &hostport[..colon_idx];
    if host.is_empty() {
        return Err(ParseError::MissingHost(hostport.to_owned()));
    }
    let port_str = &hostport[colon_idx + 1..];
    let port = port_str
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidPort(port_str.to_owned()))?;
    Ok((host.to_owned(), port_from_i64(port)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hostport_should_split_host_and_port() {
        assert_eq!(
            parse_hostport("example.com:8888").unwrap(),
            ("example.com".to_owned(), 8888)
        );
        assert_eq!(
            parse_hostport("127.0.0.1:80").unwrap(),
            ("127.0.0.1".to_owned(), 80)
        );
    }

    #[test]
    fn parse_hostport_should_keep_ipv6_brackets() {
        assert_eq!(
            parse_hostport("[::1]:9000").unwrap(),
            ("[::1]".to_owned(), 9000)
        );
        assert_eq!(
            parse_hostport("[2001:db8::2]:65535").unwrap(),
            ("[2001:db8::2]".to_owned(), 65535)
        );
    }

    #[test]
    fn parse_hostport_should_reject_missing_parts() {
        assert!(matches!(
            parse_hostport("example.com"),
            Err(ParseError::MissingPort(_))
        ));
        assert!(matches!(
            parse_hostport(":8888"),
            Err(ParseError::MissingHost(_))
        ));
        assert!(matches!(
            parse_hostport("example.com:"),
            Err(ParseError::InvalidPort(_))
        ));
        assert!(matches!(
            parse_hostport("example.com:http"),
            Err(ParseError::InvalidPort(_))
        ));
    }

    #[test]
    fn port_bounds_should_be_inclusive() {
        assert_eq!(port_from_i64(0).unwrap(), 0);
        assert_eq!(port_from_i64(65535).unwrap(), 65535);
        assert!(matches!(
            port_from_i64(-1),
            Err(ParseError::PortOutOfRange(-1))
        ));
        assert!(matches!(
            port_from_i64(65536),
            Err(ParseError::PortOutOfRange(65536))
        ));
        assert!(matches!(
            parse_hostport("host:-1"),
            Err(ParseError::PortOutOfRange(-1))
        ));
        assert!(matches!(
            parse_hostport("host:65536"),
            Err(ParseError::PortOutOfRange(65536))
        ));
    }
}
