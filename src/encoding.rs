//! Exposition format implementations.

use std::fmt::Write;

pub mod text;

/// Largest magnitude at which every integer is exactly representable as
/// [`f64`].
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// An encodable gauge value.
pub trait EncodeGaugeValue {
    /// Encode the given instance via the given encoder.
    fn encode(&self, encoder: &mut GaugeValueEncoder) -> Result<(), std::fmt::Error>;
}

impl EncodeGaugeValue for f64 {
    fn encode(&self, encoder: &mut GaugeValueEncoder) -> Result<(), std::fmt::Error> {
        // Counts and sizes are integral; keep them free of a fractional part.
        if self.fract() == 0.0 && self.abs() <= MAX_EXACT_INTEGER {
            encoder.encode_i64(*self as i64)
        } else {
            encoder.encode_f64(*self)
        }
    }
}

/// Encoder for a gauge value.
pub struct GaugeValueEncoder<'a> {
    writer: &'a mut dyn Write,
}

impl std::fmt::Debug for GaugeValueEncoder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaugeValueEncoder").finish()
    }
}

impl<'a> GaugeValueEncoder<'a> {
    pub(crate) fn new(writer: &'a mut dyn Write) -> Self {
        Self { writer }
    }

    fn encode_i64(&mut self, v: i64) -> Result<(), std::fmt::Error> {
        self.writer.write_str(itoa::Buffer::new().format(v))
    }

    fn encode_f64(&mut self, v: f64) -> Result<(), std::fmt::Error> {
        if v.is_nan() {
            self.writer.write_str("NaN")
        } else if v.is_infinite() {
            self.writer
                .write_str(if v.is_sign_positive() { "+Inf" } else { "-Inf" })
        } else {
            self.writer.write_str(dtoa::Buffer::new().format_finite(v))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<V: EncodeGaugeValue>(v: V) -> String {
        let mut buffer = String::new();
        v.encode(&mut GaugeValueEncoder::new(&mut buffer)).unwrap();
        buffer
    }

    #[test]
    fn integral_values_have_no_fraction() {
        assert_eq!("0", encode(0.0));
        assert_eq!("43", encode(43.0));
        assert_eq!("-2", encode(-2.0));
        assert_eq!("2048", encode(2048.0));
        assert_eq!("1000000", encode(1_000_000.0));
    }

    #[test]
    fn fractional_and_special_values() {
        assert_eq!("1.5", encode(1.5));
        assert_eq!("NaN", encode(f64::NAN));
        assert_eq!("+Inf", encode(f64::INFINITY));
        assert_eq!("-Inf", encode(f64::NEG_INFINITY));
    }
}
