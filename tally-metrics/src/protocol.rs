use std::fmt;
use std::iter::FusedIterator;

/// An error parsing a metric sample from the submission protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("failed to parse metric sample")]
pub struct ParseSampleError;

/// The typed value of a [`Sample`].
#[derive(Clone, Debug, PartialEq)]
pub enum SampleValue {
    /// A signed delta to accumulate into a counter.
    ///
    /// Counters are declared as `"c"`. Any type tag that is not `"g"`, `"ms"` or `"s"` also
    /// aggregates as a counter, which makes `"c"` the canonical spelling of the default.
    Counter(i64),

    /// A gauge update.
    ///
    /// Gauges are declared as `"g"`. A value with an explicit `+` or `-` prefix is a relative
    /// adjustment for keys that already carry a value; everything else replaces the value. The
    /// prefix is recorded in `delta`, resolving it against the current state is up to the
    /// aggregator.
    Gauge {
        /// The parsed value, negative for `-`-prefixed updates.
        value: i64,
        /// Whether the textual value carried an explicit sign.
        delta: bool,
    },

    /// A single timer measurement in milliseconds, declared as `"ms"`. Never negative.
    Timer(i64),

    /// A member to record in a unique-value set, declared as `"s"`.
    Set(String),
}

impl SampleValue {
    /// Returns the canonical type tag for this value.
    pub fn ty(&self) -> &'static str {
        match self {
            Self::Counter(_) => "c",
            Self::Gauge { .. } => "g",
            Self::Timer(_) => "ms",
            Self::Set(_) => "s",
        }
    }
}

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Counter(value) => value.fmt(f),
            Self::Gauge { value, .. } => value.fmt(f),
            Self::Timer(value) => value.fmt(f),
            Self::Set(value) => value.fmt(f),
        }
    }
}

/// A single decoded line of the submission protocol.
///
/// # Submission Protocol
///
/// ```text
/// <key>:<value>|<type>[|@<sample rate>]
/// ```
///
/// The key is everything up to the first colon and is treated as an opaque, case-sensitive
/// string. Dotted names are a convention of submitters; no hierarchy is parsed here.
///
/// A sample rate, if present, must consist of `@` followed by a non-negative floating point
/// number. It declares that only this fraction of true events was submitted; aggregation
/// extrapolates counts by its inverse.
///
/// # Example
///
/// ```
/// use tally_metrics::Sample;
///
/// let sample = Sample::parse("endpoint.hits:21|c").expect("sample should parse");
/// assert_eq!(sample.key, "endpoint.hits");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    /// The metric key.
    pub key: String,
    /// The decoded value.
    pub value: SampleValue,
    /// The declared sample rate, `1.0` if absent.
    pub sample_rate: f64,
}

impl Sample {
    fn parse_str(line: &str) -> Option<Self> {
        let (key, rest) = line.split_once(':')?;

        let mut fields = rest.split('|');
        let value_str = fields.next()?;
        let ty = fields.next()?.trim();

        let sample_rate = match fields.next() {
            Some(field) => parse_sample_rate(field)?,
            None => 1.0,
        };

        let value = match ty {
            "s" => SampleValue::Set(value_str.to_owned()),
            "ms" => {
                let value: i64 = value_str.parse().ok()?;
                if value < 0 {
                    return None;
                }
                SampleValue::Timer(value)
            }
            "g" => SampleValue::Gauge {
                value: value_str.parse().ok()?,
                delta: value_str.starts_with('+') || value_str.starts_with('-'),
            },
            _ => SampleValue::Counter(value_str.parse().ok()?),
        };

        Some(Sample {
            key: key.to_owned(),
            value,
            sample_rate,
        })
    }

    /// Parses a single sample from one line of the raw protocol.
    ///
    /// # Example
    ///
    /// ```
    /// use tally_metrics::Sample;
    ///
    /// let sample = Sample::parse("endpoint.response_time:57|ms").expect("sample should parse");
    /// ```
    pub fn parse(line: &str) -> Result<Self, ParseSampleError> {
        Self::parse_str(line).ok_or(ParseSampleError)
    }

    /// Parses all samples of a packet payload.
    ///
    /// Returns a result for each line in `slice`, ignoring empty lines. Both UNIX newlines
    /// (`\n`) and Windows newlines (`\r\n`) are supported.
    ///
    /// It is possible to continue consuming the iterator after `Err` is yielded; one malformed
    /// line never invalidates the rest of the packet.
    ///
    /// # Example
    ///
    /// ```
    /// use tally_metrics::Sample;
    ///
    /// let data = b"endpoint.response_time:57|ms\nendpoint.hits:1|c";
    ///
    /// for result in Sample::parse_all(data) {
    ///     let sample = result.expect("sample should parse");
    ///     println!("{}: {:?}", sample.key, sample.value);
    /// }
    /// ```
    pub fn parse_all(slice: &[u8]) -> ParseSamples<'_> {
        ParseSamples { slice }
    }
}

/// Parses the `@rate` field following the type tag.
fn parse_sample_rate(field: &str) -> Option<f64> {
    let rate: f64 = field.strip_prefix('@')?.parse().ok()?;
    (rate >= 0.0).then_some(rate)
}

/// Iterator over parsed samples returned from [`Sample::parse_all`].
#[derive(Clone, Debug, Default)]
pub struct ParseSamples<'a> {
    slice: &'a [u8],
}

impl Iterator for ParseSamples<'_> {
    type Item = Result<Sample, ParseSampleError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.slice.is_empty() {
                return None;
            }

            let mut split = self.slice.splitn(2, |&b| b == b'\n');
            let current = split.next()?;
            self.slice = split.next().unwrap_or_default();

            let string = match std::str::from_utf8(current) {
                Ok(string) => string.strip_suffix('\r').unwrap_or(string),
                Err(_) => return Some(Err(ParseSampleError)),
            };

            if !string.is_empty() {
                return Some(Sample::parse(string));
            }
        }
    }
}

impl FusedIterator for ParseSamples<'_> {}
