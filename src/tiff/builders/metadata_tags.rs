//! GDAL metadata tags
//!
//! GDAL_NODATA carries the no-data marker as text; GDAL_METADATA is an
//! XML document holding dataset items and per-band descriptions.

use log::debug;

use crate::tiff::constants::{field_types, tags};
use crate::tiff::ifd::IFD;
use crate::utils::tiff_utils::{self, ExternalData};

pub struct MetadataBuilder;

impl MetadataBuilder {
    /// Adds GDAL_NODATA; NaN is spelled the way GDAL writes it
    pub fn add_nodata_tag(ifd: &mut IFD, external_data: &mut ExternalData, ifd_index: usize, is_big_tiff: bool, nodata: f64) {
        let text = Self::format_nodata(nodata);
        debug!("Adding GDAL NoData tag: {}", text);
        tiff_utils::store_tag(
            ifd,
            external_data,
            ifd_index,
            is_big_tiff,
            tags::GDAL_NODATA,
            field_types::ASCII,
            tiff_utils::ascii_to_bytes(&text),
        );
    }

    pub fn format_nodata(nodata: f64) -> String {
        if nodata.is_nan() {
            "nan".to_string()
        } else if nodata.fract() == 0.0 {
            format!("{}", nodata as i64)
        } else {
            format!("{}", nodata)
        }
    }

    /// Adds GDAL_METADATA with dataset items and one DESCRIPTION per band
    pub fn add_gdal_metadata_tag(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        ifd_index: usize,
        is_big_tiff: bool,
        items: &[(String, String)],
        band_descriptions: &[String],
    ) {
        let xml = Self::metadata_xml(items, band_descriptions);
        tiff_utils::store_tag(
            ifd,
            external_data,
            ifd_index,
            is_big_tiff,
            tags::GDAL_METADATA,
            field_types::ASCII,
            tiff_utils::ascii_to_bytes(&xml),
        );
    }

    /// Adds an ASCII tag such as ImageDescription or Software
    pub fn add_ascii_tag(ifd: &mut IFD, external_data: &mut ExternalData, ifd_index: usize, is_big_tiff: bool, tag: u16, text: &str) {
        tiff_utils::store_tag(
            ifd,
            external_data,
            ifd_index,
            is_big_tiff,
            tag,
            field_types::ASCII,
            tiff_utils::ascii_to_bytes(text),
        );
    }

    pub fn metadata_xml(items: &[(String, String)], band_descriptions: &[String]) -> String {
        let mut xml = String::from("<GDALMetadata>\n");
        for (name, value) in items {
            xml.push_str(&format!("  <Item name=\"{}\">{}</Item>\n", escape(name), escape(value)));
        }
        for (sample, description) in band_descriptions.iter().enumerate() {
            xml.push_str(&format!(
                "  <Item name=\"DESCRIPTION\" sample=\"{}\" role=\"description\">{}</Item>\n",
                sample,
                escape(description)
            ));
        }
        xml.push_str("</GDALMetadata>");
        xml
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

/// Band descriptions found in a GDAL_METADATA document, in sample order
pub fn parse_band_descriptions(xml: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();
    for line in xml.lines() {
        let line = line.trim();
        if !line.starts_with("<Item name=\"DESCRIPTION\"") {
            continue;
        }
        let sample = line
            .split("sample=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .and_then(|s| s.parse::<usize>().ok());
        let text = line.split('>').nth(1).and_then(|rest| rest.split('<').next());
        if let (Some(sample), Some(text)) = (sample, text) {
            let text = text.replace("&quot;", "\"").replace("&gt;", ">").replace("&lt;", "<").replace("&amp;", "&");
            found.push((sample, text));
        }
    }
    found.sort_by_key(|(sample, _)| *sample);
    found.into_iter().map(|(_, text)| text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodata_formatting() {
        assert_eq!(MetadataBuilder::format_nodata(f64::NAN), "nan");
        assert_eq!(MetadataBuilder::format_nodata(-32768.0), "-32768");
        assert_eq!(MetadataBuilder::format_nodata(0.5), "0.5");
    }

    #[test]
    fn band_descriptions_survive_the_xml() {
        let xml = MetadataBuilder::metadata_xml(
            &[("PRODUCT".to_string(), "greenest".to_string())],
            &["NDVI_max".to_string(), "time_at_max".to_string()],
        );
        assert_eq!(parse_band_descriptions(&xml), vec!["NDVI_max", "time_at_max"]);
    }
}
