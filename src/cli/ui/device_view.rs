use std::fmt::{self, Display, Formatter};

use crate::cli::report::DeviceReport;
use crate::product::Features;

use super::painter::Painter;
use super::table::Table;

/// Renders discovered devices as one table row each.
pub(crate) struct DeviceListView<'a> {
    reports: &'a [DeviceReport],
    painter: &'a Painter,
}

impl<'a> DeviceListView<'a> {
    pub(crate) fn new(reports: &'a [DeviceReport], painter: &'a Painter) -> Self {
        Self { reports, painter }
    }
}

impl Display for DeviceListView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.reports.is_empty() {
            return write!(f, "{}", self.painter.warning("No devices answered."));
        }

        let rows = self
            .reports
            .iter()
            .map(|report| {
                vec![
                    self.painter.target(report.target),
                    report.addr.to_string(),
                    self.painter.or_unknown(report.label.clone()),
                    self.painter.or_unknown(report.product.clone()),
                ]
            })
            .collect();
        writeln!(
            f,
            "{}",
            self.painter
                .heading(format!("Found {} device(s)", self.reports.len()))
        )?;
        write!(
            f,
            "{}",
            Table::grid(["target", "address", "label", "product"], rows)
        )
    }
}

/// Renders one device's `info` report as a key-value table.
pub(crate) struct DeviceReportView<'a> {
    report: &'a DeviceReport,
    painter: &'a Painter,
}

impl<'a> DeviceReportView<'a> {
    pub(crate) fn new(report: &'a DeviceReport, painter: &'a Painter) -> Self {
        Self { report, painter }
    }
}

impl Display for DeviceReportView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let report = self.report;
        let or_unknown = |value: Option<String>| self.painter.or_unknown(value);
        let table = Table::key_value(
            self.painter,
            vec![
                ("target", self.painter.target(report.target)),
                ("address", report.addr.to_string()),
                ("label", or_unknown(report.label.clone())),
                ("product", or_unknown(report.product.clone())),
                (
                    "hardware",
                    or_unknown(report.hardware.map(|hardware| hardware.to_string())),
                ),
                (
                    "firmware",
                    or_unknown(report.firmware.map(|firmware| firmware.to_string())),
                ),
                (
                    "features",
                    or_unknown(report.features.as_ref().map(feature_summary)),
                ),
            ],
        );
        write!(f, "{table}")
    }
}

fn feature_summary(features: &Features) -> String {
    let flags = [
        ("color", features.color),
        ("chain", features.chain),
        ("matrix", features.matrix),
        ("multizone", features.multizone),
        ("extended_multizone", features.extended_multizone),
        ("infrared", features.infrared),
        ("hev", features.hev),
        ("relays", features.relays),
        ("buttons", features.buttons),
    ];
    let mut parts: Vec<String> = flags
        .into_iter()
        .filter(|(_, enabled)| *enabled == Some(true))
        .map(|(name, _)| name.to_owned())
        .collect();
    if let Some(range) = features.temperature_range {
        parts.push(format!("{}-{}K", range.min(), range.max()));
    }
    if parts.is_empty() {
        return "none".to_owned();
    }
    parts.join(", ")
}
