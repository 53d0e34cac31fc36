//! One report cycle's samples and their form payload

use alloc::string::String;
use core::fmt::Write;

use heapless::Vec;

use crate::config::MAX_CHANNELS;
use crate::http::push_form_encoded;
use crate::sensors::ChannelSample;

/// Value sent for a channel whose converter had no data.
pub const NO_DATA: &str = "nan";

/// All samples of one cycle, in global channel order.
#[derive(Debug, Clone, Default)]
pub struct Report<'a> {
    samples: Vec<ChannelSample<'a>, MAX_CHANNELS>,
}

impl<'a> Report<'a> {
    pub const fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    /// Append the next channel. Gives the sample back when the report is full.
    pub fn push(&mut self, sample: ChannelSample<'a>) -> Result<(), ChannelSample<'a>> {
        self.samples.push(sample)
    }

    pub fn samples(&self) -> &[ChannelSample<'a>] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of channels that carry a reading.
    pub fn with_data(&self) -> usize {
        self.samples.iter().filter(|s| s.raw.is_some()).count()
    }

    /// `label=value` pairs joined by `&`, values in millivolts with two
    /// decimals.
    pub fn payload(&self) -> String {
        let mut body = String::with_capacity(self.samples.len() * 12);
        for (i, sample) in self.samples.iter().enumerate() {
            if i > 0 {
                body.push('&');
            }
            push_form_encoded(&mut body, sample.label);
            body.push('=');
            match sample.millivolts() {
                // Writing into a String cannot fail.
                Some(mv) => {
                    let _ = write!(body, "{mv}");
                }
                None => body.push_str(NO_DATA),
            }
        }
        body
    }
}
