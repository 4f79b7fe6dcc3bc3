use std::fs;
use std::ops::Range;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::time::Epoch;

/// Length of a TLE line once trailing whitespace is removed.
pub const TLE_LINE_LEN: usize = 69;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TleError {
    #[error("malformed TLE line {line}: {reason}")]
    MalformedLine { line: u8, reason: String },
    #[error("checksum mismatch on TLE line {line}: expected {expected}, computed {computed}")]
    ChecksumMismatch { line: u8, expected: u8, computed: u8 },
}

#[derive(Debug, Error)]
pub enum TleFileError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid TLE pair at line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: TleError,
    },
}

/// Mean orbital elements decoded from a two-line element set. Angles are in
/// degrees and mean motion in revolutions per day, exactly as printed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrbitalElements {
    pub object_name: Option<String>,
    pub norad_id: u32,
    pub classification: char,
    pub international_designator: String,
    pub epoch: Epoch,
    /// First derivative of mean motion divided by two, rev/day².
    pub mean_motion_dot: f64,
    /// Second derivative of mean motion divided by six, rev/day³.
    pub mean_motion_ddot: f64,
    /// Drag term, 1/earth radii.
    pub bstar: f64,
    pub ephemeris_type: u8,
    pub element_set_number: u32,
    pub inclination_deg: f64,
    pub raan_deg: f64,
    pub eccentricity: f64,
    pub argument_of_perigee_deg: f64,
    pub mean_anomaly_deg: f64,
    pub mean_motion: f64,
    pub revolution_number: u32,
    pub checksums: [u8; 2],
}

/// Modulo-10 sum of the digits of columns 1-68, counting each '-' as 1.
pub fn checksum(line: &str) -> u8 {
    let sum: u32 = line
        .bytes()
        .take(TLE_LINE_LEN - 1)
        .map(|b| match b {
            b'0'..=b'9' => u32::from(b - b'0'),
            b'-' => 1,
            _ => 0,
        })
        .sum();
    (sum % 10) as u8
}

/// Parses and validates a two-line element set.
pub fn parse(line1: &str, line2: &str) -> Result<OrbitalElements, TleError> {
    let l1 = Columns::new(line1, 1)?;
    let l2 = Columns::new(line2, 2)?;

    let norad_id = l1.catalog_number(2..7)?;
    let norad_id_2 = l2.catalog_number(2..7)?;
    if norad_id != norad_id_2 {
        return Err(l2.malformed(format!(
            "catalog number {norad_id_2} does not match line 1 ({norad_id})"
        )));
    }

    l1.separators(&[1, 8, 17, 32, 43, 52, 61, 63])?;
    l2.separators(&[1, 7, 16, 25, 33, 42, 51])?;

    let classification = match l1.text(7..8) {
        " " => 'U',
        c => c.chars().next().unwrap_or('U'),
    };
    let year = l1.unsigned(18..20, "epoch year")?;
    let day_of_year = l1.float(20..32, "epoch day")?;
    if !(1.0..367.0).contains(&day_of_year) {
        return Err(l1.malformed(format!("epoch day {day_of_year} out of range")));
    }

    let inclination_deg = l2.float(8..16, "inclination")?;
    if !(0.0..=180.0).contains(&inclination_deg) {
        return Err(l2.malformed(format!("inclination {inclination_deg} out of range")));
    }

    let elements = OrbitalElements {
        object_name: None,
        norad_id,
        classification,
        international_designator: l1.text(9..17).trim().to_string(),
        epoch: Epoch::from_tle_fields(year, day_of_year),
        mean_motion_dot: l1.float(33..43, "mean motion derivative")?,
        mean_motion_ddot: l1.exponent(44..52, "mean motion second derivative")?,
        bstar: l1.exponent(53..61, "bstar")?,
        ephemeris_type: l1.unsigned_or_zero(62..63, "ephemeris type")? as u8,
        element_set_number: l1.unsigned_or_zero(64..68, "element set number")?,
        inclination_deg,
        raan_deg: l2.float(17..25, "right ascension")?,
        eccentricity: l2.implied_decimal(26..33, "eccentricity")?,
        argument_of_perigee_deg: l2.float(34..42, "argument of perigee")?,
        mean_anomaly_deg: l2.float(43..51, "mean anomaly")?,
        mean_motion: l2.float(52..63, "mean motion")?,
        revolution_number: l2.unsigned_or_zero(63..68, "revolution number")?,
        checksums: [l1.checksum, l2.checksum],
    };

    debug!(norad = elements.norad_id, "Parsed TLE");
    Ok(elements)
}

/// Parses a block of element sets in 2-line or 3-line (name first) format.
/// A line 1 without a following line 2 is skipped.
pub fn parse_tle_text(content: &str) -> Result<Vec<OrbitalElements>, TleFileError> {
    let lines: Vec<(usize, &str)> = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end()))
        .filter(|(_, l)| !l.is_empty())
        .collect();

    let mut elements = Vec::new();
    let mut i = 0usize;
    while i < lines.len() {
        let (line_no, line) = lines[i];
        if !line.starts_with('1') {
            i += 1;
            continue;
        }

        let name = i
            .checked_sub(1)
            .map(|p| lines[p].1)
            .filter(|prev| !(prev.starts_with('1') || prev.starts_with('2')))
            .map(|prev| prev.trim().to_string());

        let next = match lines.get(i + 1) {
            Some((_, l)) if l.starts_with('2') => *l,
            _ => {
                warn!(line = line_no, "Skipping invalid TLE pair: missing line 2");
                i += 1;
                continue;
            }
        };

        let mut parsed =
            parse(line, next).map_err(|source| TleFileError::Parse { line: line_no, source })?;
        parsed.object_name = name;
        elements.push(parsed);
        i += 2;
    }

    info!(count = elements.len(), "Parsed TLE elements");
    Ok(elements)
}

pub fn parse_tle_file(path: &Path) -> Result<Vec<OrbitalElements>, TleFileError> {
    let content = fs::read_to_string(path)?;
    parse_tle_text(&content)
}

/// Fixed-column view over one TLE line.
struct Columns<'a> {
    line: &'a str,
    index: u8,
    checksum: u8,
}

impl<'a> Columns<'a> {
    fn new(raw: &'a str, index: u8) -> Result<Self, TleError> {
        let line = raw.trim_end();
        let malformed = |reason: String| TleError::MalformedLine { line: index, reason };

        if !line.is_ascii() {
            return Err(malformed("contains non-ASCII characters".into()));
        }
        if line.len() != TLE_LINE_LEN {
            return Err(malformed(format!(
                "expected {TLE_LINE_LEN} characters, found {}",
                line.len()
            )));
        }
        let expected_number = char::from(b'0' + index);
        if !line.starts_with(expected_number) {
            return Err(malformed(format!("line must start with '{expected_number}'")));
        }

        let expected = match line.as_bytes()[TLE_LINE_LEN - 1] {
            b @ b'0'..=b'9' => b - b'0',
            _ => return Err(malformed("checksum column is not a digit".into())),
        };
        let computed = checksum(line);
        if expected != computed {
            return Err(TleError::ChecksumMismatch {
                line: index,
                expected,
                computed,
            });
        }

        Ok(Columns {
            line,
            index,
            checksum: expected,
        })
    }

    fn malformed(&self, reason: String) -> TleError {
        TleError::MalformedLine {
            line: self.index,
            reason,
        }
    }

    fn text(&self, columns: Range<usize>) -> &'a str {
        &self.line[columns]
    }

    fn separators(&self, columns: &[usize]) -> Result<(), TleError> {
        match columns.iter().find(|&&c| self.line.as_bytes()[c] != b' ') {
            Some(c) => Err(self.malformed(format!("expected blank at column {}", c + 1))),
            None => Ok(()),
        }
    }

    fn float(&self, columns: Range<usize>, name: &str) -> Result<f64, TleError> {
        let field = self.text(columns).trim();
        field
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| self.malformed(format!("{name} {field:?} is not a number")))
    }

    fn unsigned(&self, columns: Range<usize>, name: &str) -> Result<u32, TleError> {
        let field = self.text(columns).trim();
        if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.malformed(format!("{name} {field:?} is not an unsigned integer")));
        }
        field
            .parse()
            .map_err(|_| self.malformed(format!("{name} {field:?} is out of range")))
    }

    fn unsigned_or_zero(&self, columns: Range<usize>, name: &str) -> Result<u32, TleError> {
        if self.text(columns.clone()).trim().is_empty() {
            Ok(0)
        } else {
            self.unsigned(columns, name)
        }
    }

    /// Catalog number, accepting the Alpha-5 form where a leading letter
    /// stands for 10-33 (I and O are skipped).
    fn catalog_number(&self, columns: Range<usize>) -> Result<u32, TleError> {
        let field = self.text(columns.clone());
        let lead = field.as_bytes()[0];
        if !lead.is_ascii_uppercase() {
            return self.unsigned(columns, "catalog number");
        }
        let prefix = match lead {
            b'I' | b'O' => None,
            b'A'..=b'H' => Some(u32::from(lead - b'A') + 10),
            b'J'..=b'N' => Some(u32::from(lead - b'J') + 18),
            _ => Some(u32::from(lead - b'P') + 23),
        }
        .ok_or_else(|| self.malformed(format!("invalid Alpha-5 prefix in {field:?}")))?;
        let rest = self.unsigned(columns.start + 1..columns.end, "catalog number")?;
        Ok(prefix * 10_000 + rest)
    }

    /// Digits with an implied leading "0.", e.g. `0006703` is 0.0006703.
    fn implied_decimal(&self, columns: Range<usize>, name: &str) -> Result<f64, TleError> {
        let field = self.text(columns);
        if !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.malformed(format!("{name} {field:?} must be all digits")));
        }
        format!("0.{field}")
            .parse()
            .map_err(|_| self.malformed(format!("{name} {field:?} is not a number")))
    }

    /// Implied-decimal mantissa with exponent, e.g. `-11606-4` is -0.11606e-4.
    fn exponent(&self, columns: Range<usize>, name: &str) -> Result<f64, TleError> {
        let field = self.text(columns);
        let invalid = || self.malformed(format!("{name} {field:?} is not in ±NNNNN±N form"));
        if field.trim().is_empty() {
            return Ok(0.0);
        }

        let sign = match &field[..1] {
            "-" => -1.0,
            " " | "+" => 1.0,
            _ => return Err(invalid()),
        };
        let mantissa = field[1..6].trim();
        let exponent = field[6..8].trim();
        if mantissa.is_empty() || !mantissa.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let mantissa: f64 = format!("0.{mantissa}").parse().map_err(|_| invalid())?;
        let exponent: i32 = exponent.parse().map_err(|_| invalid())?;
        Ok(sign * mantissa * 10f64.powi(exponent))
    }
}
