//! Capture line parsing.
//!
//! The scrubber writes one record per line. Client lines look like
//!
//! ```text
//! C 2013-06-01 12:00:01 00:14:6C:7E:40:80 00:0F:B5:32:31:31  -47 ...   HomeNet, CoffeeShop
//! ```
//!
//! with the probed network names starting at a fixed column.

use std::collections::BTreeSet;

use crate::config::defaults::PROBE_COLUMN;
use crate::error::ParseError;
use crate::record::{AccessPointRecord, Observation, Power, Record};

/// Parse one capture line.
pub fn parse(line: &str) -> Result<Record, ParseError> {
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some("A") => Ok(Record::AccessPoint(AccessPointRecord)),
        Some("C") => parse_client(line, tokens).map(Record::Client),
        Some(other) => Err(ParseError::UnknownRecordKind(other.to_string())),
        None => Err(ParseError::malformed("kind", "empty line")),
    }
}

fn parse_client<'a>(
    line: &'a str,
    mut tokens: impl Iterator<Item = &'a str>,
) -> Result<Observation, ParseError> {
    // Date and time are ignored, the ingest time is used instead.
    let _date = tokens
        .next()
        .ok_or_else(|| ParseError::malformed("date", "missing"))?;
    let _time = tokens
        .next()
        .ok_or_else(|| ParseError::malformed("time", "missing"))?;
    let ap_id = tokens
        .next()
        .ok_or_else(|| ParseError::malformed("ap", "missing"))?;
    let device_id = tokens
        .next()
        .ok_or_else(|| ParseError::malformed("mac", "missing"))?;
    let power = tokens
        .next()
        .ok_or_else(|| ParseError::malformed("power", "missing"))?;

    Ok(Observation {
        ap_id: ap_id.to_string(),
        device_id: device_id.to_string(),
        power: parse_power(power)?,
        probes: parse_probes(line),
    })
}

/// Parse a signed power token. Sentinel values map to `None`, garbage is an error.
pub fn parse_power(token: &str) -> Result<Option<Power>, ParseError> {
    let dbm: i32 = token
        .parse()
        .map_err(|_| ParseError::malformed("power", format!("`{}` is not an integer", token)))?;
    Ok(Power::new(dbm))
}

/// Probe names from the fixed-offset tail of a client line.
pub fn parse_probes(line: &str) -> BTreeSet<String> {
    let tail = match line.char_indices().nth(PROBE_COLUMN) {
        Some((offset, _)) => &line[offset..],
        None => return BTreeSet::new(),
    };

    tail.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordKind;

    fn client_line(mac: &str, power: &str, probes: &str) -> String {
        let head = format!(
            "C 2013-06-01 12:00:01 00:14:6C:7E:40:80 {} {:>4}   0 - 1    0   12",
            mac, power
        );
        assert!(head.len() < PROBE_COLUMN);
        format!("{:<width$}{}\n", head, probes, width = PROBE_COLUMN)
    }

    fn parse_client_line(line: &str) -> Observation {
        match parse(line).unwrap() {
            Record::Client(observation) => observation,
            other => panic!("expected client, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_client() {
        let line = client_line("00:0F:B5:32:31:31", "-47", "HomeNet, CoffeeShop");
        let obs = parse_client_line(&line);

        assert_eq!(obs.ap_id, "00:14:6C:7E:40:80");
        assert_eq!(obs.device_id, "00:0F:B5:32:31:31");
        assert_eq!(obs.power.map(Power::dbm), Some(-47));
        let expected: BTreeSet<String> = ["CoffeeShop", "HomeNet"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(obs.probes, expected);
    }

    #[test]
    fn test_parse_probes_trimmed_and_deduplicated() {
        let line = format!(
            "{:<width$}HomeNet, CoffeeShop,, ,HomeNet \r\n",
            "C d t ap 00:0F:B5:32:31:31 -60",
            width = PROBE_COLUMN
        );
        let obs = parse_client_line(&line);
        let expected: BTreeSet<String> = ["CoffeeShop", "HomeNet"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(obs.probes, expected);
    }

    #[test]
    fn test_short_line_has_no_probes() {
        let obs = parse_client_line("C d t ap 00:0F:B5:32:31:31 -60");
        assert!(obs.probes.is_empty());
        assert_eq!(obs.power.map(Power::dbm), Some(-60));
    }

    #[test]
    fn test_power_sentinels() {
        for (token, expected) in [
            ("-50", Some(-50)),
            ("-126", Some(-126)),
            ("-2", Some(-2)),
            ("-1", None),
            ("0", None),
            ("-127", None),
            ("-300", None),
        ] {
            let line = format!("C d t ap mac {}", token);
            let obs = parse_client_line(&line);
            assert_eq!(obs.power.map(Power::dbm), expected, "power token {}", token);
        }
    }

    #[test]
    fn test_unparsable_power_is_malformed() {
        let err = parse("C d t ap mac loud").unwrap_err();
        assert!(matches!(err, ParseError::MalformedField { field: "power", .. }));
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let err = parse("C 2013-06-01 12:00:01 ap").unwrap_err();
        assert!(matches!(err, ParseError::MalformedField { field: "mac", .. }));

        let err = parse("   \n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedField { field: "kind", .. }));
    }

    #[test]
    fn test_access_point() {
        let record = parse("A 2013-06-01 12:00:01 00:14:6C:7E:40:80 -30 whatever").unwrap();
        assert_eq!(record, Record::AccessPoint(AccessPointRecord));
        assert_eq!(record.kind(), RecordKind::AccessPoint);
    }

    #[test]
    fn test_unknown_kind() {
        assert_eq!(
            parse("X 1 2 3").unwrap_err(),
            ParseError::UnknownRecordKind("X".to_string())
        );
        // The tag is a whole token, not a prefix.
        assert_eq!(
            parse("CA d t ap mac -40").unwrap_err(),
            ParseError::UnknownRecordKind("CA".to_string())
        );
    }

    #[test]
    fn test_reparse_is_stable() {
        let line = client_line("00:0F:B5:32:31:31", "-47", "a, b");
        assert_eq!(parse(&line).unwrap(), parse(&line).unwrap());
    }
}
