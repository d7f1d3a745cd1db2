//! Prometheus text exposition format (version 0.0.4).
//!
//! ```
//! # use openstack_usage_exporter::encoding::text::encode;
//! # use openstack_usage_exporter::metrics::family::MetricFamily;
//! # use openstack_usage_exporter::registry::{Descriptor, Snapshot};
//! # use std::borrow::Cow;
//! #
//! let mut family = MetricFamily::new(Descriptor::new(
//!     "openstack_project_load_balancers",
//!     "Total number of load balancers per OpenStack project",
//!     vec![Cow::Borrowed("project_id")],
//! ));
//! family.insert(vec!["6ee08ba2".to_owned()], 3.0);
//! let snapshot: Snapshot = std::iter::once(family).collect();
//!
//! let mut buffer = String::new();
//! encode(&mut buffer, &snapshot).unwrap();
//!
//! let expected = "# HELP openstack_project_load_balancers Total number of load balancers per OpenStack project\n".to_owned() +
//!                "# TYPE openstack_project_load_balancers gauge\n" +
//!                "openstack_project_load_balancers{project_id=\"6ee08ba2\"} 3\n";
//! assert_eq!(expected, buffer);
//! ```

use std::fmt::Write;

use crate::encoding::{EncodeGaugeValue, GaugeValueEncoder};
use crate::registry::{Descriptor, Snapshot};

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Encode the metric families of a [`Snapshot`] into the provided [`Write`]r
/// using the Prometheus text format.
///
/// Families are written in the snapshot's order (by name), samples ordered by
/// label values.
pub fn encode<W>(writer: &mut W, snapshot: &Snapshot) -> Result<(), std::fmt::Error>
where
    W: Write,
{
    for family in snapshot.families() {
        let mut descriptor_encoder = DescriptorEncoder { writer: &mut *writer };
        let mut metric_encoder = descriptor_encoder.encode_descriptor(family.descriptor())?;
        for (label_values, value) in family.samples() {
            metric_encoder.encode_gauge(label_values, &value)?;
        }
    }

    Ok(())
}

/// Writes the `# HELP` and `# TYPE` lines of one family.
struct DescriptorEncoder<'a, W> {
    writer: &'a mut W,
}

impl<W: Write> DescriptorEncoder<'_, W> {
    fn encode_descriptor<'s>(
        &'s mut self,
        descriptor: &'s Descriptor,
    ) -> Result<MetricEncoder<'s, W>, std::fmt::Error> {
        self.writer.write_str("# HELP ")?;
        self.writer.write_str(descriptor.name())?;
        self.writer.write_str(" ")?;
        write_escaped(&mut *self.writer, descriptor.help(), false)?;
        self.writer.write_str("\n")?;

        self.writer.write_str("# TYPE ")?;
        self.writer.write_str(descriptor.name())?;
        self.writer.write_str(" ")?;
        self.writer.write_str(descriptor.metric_type().as_str())?;
        self.writer.write_str("\n")?;

        Ok(MetricEncoder {
            writer: &mut *self.writer,
            descriptor,
        })
    }
}

/// Writes the sample lines of one family.
struct MetricEncoder<'a, W> {
    writer: &'a mut W,
    descriptor: &'a Descriptor,
}

impl<W: Write> MetricEncoder<'_, W> {
    fn encode_gauge(
        &mut self,
        label_values: &[String],
        v: &impl EncodeGaugeValue,
    ) -> Result<(), std::fmt::Error> {
        self.writer.write_str(self.descriptor.name())?;
        self.encode_labels(label_values)?;
        self.writer.write_str(" ")?;
        v.encode(&mut GaugeValueEncoder::new(&mut *self.writer))?;
        self.writer.write_str("\n")?;

        Ok(())
    }

    fn encode_labels(&mut self, label_values: &[String]) -> Result<(), std::fmt::Error> {
        let label_names = self.descriptor.label_names();
        if label_names.is_empty() {
            return Ok(());
        }

        self.writer.write_str("{")?;
        for (i, (name, value)) in label_names.iter().zip(label_values).enumerate() {
            if i > 0 {
                self.writer.write_str(",")?;
            }
            self.writer.write_str(name)?;
            self.writer.write_str("=\"")?;
            write_escaped(&mut *self.writer, value, true)?;
            self.writer.write_str("\"")?;
        }
        self.writer.write_str("}")?;

        Ok(())
    }
}

/// Escapes backslash and line feed, and in label values also the double quote.
fn write_escaped<W: Write>(writer: &mut W, s: &str, quote: bool) -> Result<(), std::fmt::Error> {
    for c in s.chars() {
        match c {
            '\\' => writer.write_str("\\\\")?,
            '\n' => writer.write_str("\\n")?,
            '"' if quote => writer.write_str("\\\"")?,
            c => writer.write_char(c)?,
        }
    }
    Ok(())
}
