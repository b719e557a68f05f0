use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use nom::{
    bytes::complete::{is_not, tag, tag_no_case},
    character::complete::char,
    combinator::{opt, rest},
    multi::many0,
    sequence::{preceded, terminated},
    IResult,
};
use percent_encoding::percent_decode_str;

const DEFAULT_MEDIA_TYPE: &'static str = "text/plain";

/// An RFC 2397 `data:` URI.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUri<'a> {
    /// Lowercased media type, e.g. `image/png`.
    pub media_type: String,
    pub is_base64: bool,
    pub payload: &'a str,
}

fn media_type(input: &str) -> IResult<&str, Option<&str>> {
    opt(is_not(";,"))(input)
}

fn parameter(input: &str) -> IResult<&str, &str> {
    preceded(char(';'), is_not(";,"))(input)
}

fn data_uri(input: &str) -> IResult<&str, DataUri> {
    let (input, _) = tag_no_case("data:")(input)?;
    let (input, media_type) = media_type(input)?;
    let (input, parameters) = terminated(many0(parameter), tag(","))(input)?;
    let (input, payload) = rest(input)?;
    let is_base64 = parameters
        .iter()
        .any(|param| param.trim().eq_ignore_ascii_case("base64"));
    let media_type = match media_type.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_lowercase(),
        _ => DEFAULT_MEDIA_TYPE.to_owned(),
    };
    Ok((
        input,
        DataUri {
            media_type,
            is_base64,
            payload,
        },
    ))
}

impl<'a> DataUri<'a> {
    pub fn parse(input: &'a str) -> Result<DataUri<'a>> {
        match data_uri(input.trim()) {
            Ok((_, uri)) => Ok(uri),
            Err(_) => Err(anyhow!("Malformed data URI")),
        }
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    pub fn is_svg(&self) -> bool {
        self.media_type == "image/svg+xml"
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        if self.is_base64 {
            // Whitespace sometimes sneaks into long inline payloads.
            let compact: String = self
                .payload
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            let unescaped = percent_decode_str(&compact).decode_utf8()?;
            Ok(STANDARD.decode(unescaped.as_bytes())?)
        } else {
            Ok(percent_decode_str(self.payload).collect())
        }
    }
}
