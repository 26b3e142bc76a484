//! Reply grammars for the device's command dialect.
//!
//! Each command's expected reply shape is a small versioned grammar with an
//! explicit "could not parse" outcome, so callers can tell "device
//! unreachable" from "device replied in an unexpected format" from "policy
//! says skip". All parsers are pure: the same reply text always yields the
//! same result.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::report::{LastInput, UptimeFact};

/// Literal proving the device speaks the expected command dialect. A reply
/// without it is either truncated or from a foreign device (firewalls
/// answer `show version` with something entirely different).
const DIALECT_MARKER: &str = "uptime is";

/// Hostname printed immediately before the uptime expression.
static HOSTNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\S+)?\s?uptime is").unwrap());

/// Elapsed-uptime expression: `[N year(s),] [M week(s)]` terminated by a
/// comma or end of reply.
static UPTIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"uptime is(?: (\d+) year(?:s)?,)?(?: (\d+) week(?:s)?)?(?:$|,)").unwrap()
});

/// One interface status line: name, ignored columns, state.
static INTERFACE_STATUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^([a-zA-Z]{1,4}[0-9]/[0-9]{1,2}(?:/[0-9]{1,2})?)\s+\S*\s+(connected|notconnect|disabled)",
    )
    .unwrap()
});

/// The `Last input` field of a per-interface reply.
static LAST_INPUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"Last input (\S+),").unwrap());

/// Parsed version reply: uptime fact plus an opportunistic hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UptimeReply {
    /// Self-reported hostname, when the reply carried one.
    pub hostname: Option<String>,

    /// Parsed uptime components.
    pub fact: UptimeFact,
}

/// Parse a `show version` reply.
///
/// The dialect marker must be present; a missing uptime *expression* is not
/// an error (the fact simply has no components and classifies as
/// insufficient).
pub fn parse_uptime_reply(reply: &str) -> Result<UptimeReply> {
    if !reply.contains(DIALECT_MARKER) {
        return Err(Error::Validation(
            "uptime marker missing, reply incomplete or unknown dialect".into(),
        ));
    }

    let hostname = HOSTNAME
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| !name.is_empty());

    let fact = match UPTIME.captures(reply) {
        None => UptimeFact::default(),
        Some(caps) => UptimeFact {
            years: capture_u64(caps.get(1))?,
            weeks: capture_u64(caps.get(2))?,
        },
    };

    Ok(UptimeReply { hostname, fact })
}

fn capture_u64(capture: Option<regex::Match<'_>>) -> Result<Option<u64>> {
    match capture {
        None => Ok(None),
        Some(m) => m
            .as_str()
            .parse()
            .map(Some)
            .map_err(|_| Error::Validation(format!("uptime count '{}' out of range", m.as_str()))),
    }
}

/// Parse a `show int status` reply into the list of `notconnect` interface
/// names, in reply order.
///
/// A reply where *no* line matches the status grammar is incomplete data,
/// not an empty device; that case is a validation error so it can be
/// retried and, eventually, reported as a fault rather than a clean
/// "nothing idle here".
pub fn parse_interface_status(reply: &str, device: &str) -> Result<Vec<String>> {
    let mut saw_any = false;
    let mut down = Vec::new();
    for caps in INTERFACE_STATUS.captures_iter(reply) {
        saw_any = true;
        if &caps[2] == "notconnect" {
            down.push(caps[1].to_string());
        }
    }
    if !saw_any {
        return Err(Error::Validation(format!(
            "interface status reply incomplete for {device}"
        )));
    }
    Ok(down)
}

/// Whether an interface sits on the supported chassis unit range.
///
/// A `slot/unit/port` name is admissible when the unit is 0 and the port
/// does not exceed 48; names of any other shape (no slashes, VLANs,
/// two-part names) are always admissible.
pub fn admissible(interface: &str, device: &str) -> Result<bool> {
    let parts: Vec<&str> = interface.split('/').collect();
    if parts.len() != 3 {
        return Ok(true);
    }
    let unit: u64 = parse_component(parts[1], interface, device)?;
    let port: u64 = parse_component(parts[2], interface, device)?;
    Ok(unit == 0 && port <= 48)
}

fn parse_component(component: &str, interface: &str, device: &str) -> Result<u64> {
    component.parse().map_err(|e| Error::Unknown {
        device: device.to_string(),
        message: format!("bad component '{component}' in interface {interface}: {e}"),
    })
}

/// Parse a per-interface reply and classify its `Last input` age.
///
/// Returns `None` when the port does not qualify (recent traffic, or an
/// age without a week unit). `never` always qualifies. The field being
/// absent entirely means the reply was truncated.
pub fn parse_last_input(
    reply: &str,
    min_weeks: u64,
    device: &str,
) -> Result<Option<LastInput>> {
    let caps = LAST_INPUT.captures(reply).ok_or_else(|| {
        Error::Validation(format!("last-input reply incomplete for {device}"))
    })?;
    let token = &caps[1];

    if token == "never" {
        return Ok(Some(LastInput::Never));
    }

    let Some((count, _)) = token.split_once('w') else {
        // Days or hours only: not idle long enough to matter.
        return Ok(None);
    };
    let weeks: u64 = count.parse().map_err(|e| Error::Unknown {
        device: device.to_string(),
        message: format!("bad week count in last input '{token}': {e}"),
    })?;

    if weeks > min_weeks {
        Ok(Some(LastInput::Weeks {
            raw: token.to_string(),
            weeks,
        }))
    } else {
        Ok(None)
    }
}
