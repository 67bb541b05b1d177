// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! JPEG encoding. Every call produces one standalone `EncodedFrame`; the
//! caller is responsible for sharing the result rather than re-encoding it
//! per subscriber.

use std::io::Cursor;
use std::sync::OnceLock;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::error::{RelayError, Result};
use crate::frame_source::Frame;
use crate::stream::EncodedFrame;

/// Encode one raw RGB8 frame as a JPEG.
pub fn encode(frame: &Frame, quality: u8) -> Result<EncodedFrame> {
    let mut buf = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buf);
        let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
        encoder
            .write_image(&frame.rgb, frame.width, frame.height, ExtendedColorType::Rgb8)
            .map_err(|e| RelayError::Encode(e.to_string()))?;
    }
    Ok(EncodedFrame::from(buf))
}

/// A small solid-color JPEG served when a camera has never produced a frame,
/// so clients get a valid multipart part instead of waiting indefinitely.
/// Encoded once and cached for the life of the process.
pub fn synthetic_black_frame() -> EncodedFrame {
    static FRAME: OnceLock<EncodedFrame> = OnceLock::new();
    FRAME
        .get_or_init(|| {
            let width = 640u32;
            let height = 480u32;
            let rgb = vec![0u8; (width * height * 3) as usize];
            let frame = Frame { width, height, rgb: rgb.into() };
            encode(&frame, 70).expect("synthetic frame must encode")
        })
        .clone()
}
