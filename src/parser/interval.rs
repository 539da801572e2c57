use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::debug;

use super::{child_elements, element_text};
use crate::model::SamplingInterval;
use crate::text::{integer_prefix, leading_token};

static TIME_BASE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#ddlTimeBase").unwrap());

const MINUTES_PER_HOUR: f64 = 60.0;

/// Read the station's averaging window from the first option of the
/// time-base dropdown.
pub fn parse(body: &str) -> SamplingInterval {
    let doc = Html::parse_document(body);
    let descriptor = doc
        .select(&TIME_BASE_SEL)
        .next()
        .and_then(|select| child_elements(select).next())
        .map(element_text)
        .unwrap_or_default();

    normalize(&descriptor)
}

/// `"30 Minutes"` becomes half an hour. Anything else passes its leading
/// number through as hours; a non-numeric leading token is kept verbatim.
pub fn normalize(descriptor: &str) -> SamplingInterval {
    let token = leading_token(descriptor);

    if descriptor.contains("Minutes") {
        if let Some(minutes) = integer_prefix(token) {
            return SamplingInterval::Hours(minutes as f64 / MINUTES_PER_HOUR);
        }
    } else if let Some(hours) = token.parse::<f64>().ok().filter(|h| h.is_finite()) {
        return SamplingInterval::Hours(hours);
    }

    debug!("Interval descriptor {:?} left unnormalized", descriptor);
    SamplingInterval::Unnormalized(token.to_string())
}
