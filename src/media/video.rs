use std::{fs::File, io::BufReader, path::Path, sync::Arc};

use anyhow::{Context, Result};
use image::{AnimationDecoder, RgbaImage, codecs::gif::GifDecoder};

/// Container extensions decoded as looping video. Everything else is a still.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "gif"];

pub fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// A forward-only frame decoder that can be rewound to its first frame.
pub trait VideoSource {
    /// `Ok(None)` marks end of stream.
    fn next_frame(&mut self) -> Result<Option<Arc<RgbaImage>>>;
    fn rewind(&mut self) -> Result<()>;
}

pub fn open_video(path: &Path) -> Result<Box<dyn VideoSource>> {
    let is_gif = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gif"));

    if is_gif {
        return Ok(Box::new(GifSource::open(path)?));
    }
    open_container(path)
}

#[cfg(feature = "video-ffmpeg")]
fn open_container(path: &Path) -> Result<Box<dyn VideoSource>> {
    Ok(Box::new(ffmpeg_source::FfmpegSource::open(path)?))
}

#[cfg(not(feature = "video-ffmpeg"))]
fn open_container(path: &Path) -> Result<Box<dyn VideoSource>> {
    anyhow::bail!(
        "{} needs FFmpeg, which this build was compiled without",
        path.display()
    )
}

/// Owns a decoder and loops it forever: end of stream rewinds to frame zero.
pub struct LoopingVideo {
    source: Box<dyn VideoSource>,
    current: Arc<RgbaImage>,
    primed: Option<Arc<RgbaImage>>,
}

impl LoopingVideo {
    pub fn new(mut source: Box<dyn VideoSource>) -> Result<Self> {
        let first = source
            .next_frame()?
            .context("video contains no decodable frames")?;

        Ok(Self {
            source,
            current: first.clone(),
            primed: Some(first),
        })
    }

    pub fn next_frame(&mut self) -> Arc<RgbaImage> {
        if let Some(first) = self.primed.take() {
            return first;
        }

        match self.advance() {
            Ok(frame) => self.current = frame,
            Err(err) => {
                log::warn!("video playback stalled, repeating last frame: {err:?}");
            }
        }
        self.current.clone()
    }

    fn advance(&mut self) -> Result<Arc<RgbaImage>> {
        if let Some(frame) = self.source.next_frame()? {
            return Ok(frame);
        }

        self.source.rewind().context("failed to rewind video")?;
        self.source
            .next_frame()?
            .context("video produced no frames after rewind")
    }
}

/// Animated GIF, decoded fully up front.
pub struct GifSource {
    frames: Vec<Arc<RgbaImage>>,
    cursor: usize,
}

impl GifSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let decoder = GifDecoder::new(BufReader::new(file))
            .with_context(|| format!("failed to read GIF header of {}", path.display()))?;
        let frames = decoder
            .into_frames()
            .collect_frames()
            .with_context(|| format!("failed to decode GIF frames of {}", path.display()))?;

        Ok(Self {
            frames: frames
                .into_iter()
                .map(|frame| Arc::new(frame.into_buffer()))
                .collect(),
            cursor: 0,
        })
    }
}

impl VideoSource for GifSource {
    fn next_frame(&mut self) -> Result<Option<Arc<RgbaImage>>> {
        let frame = self.frames.get(self.cursor).cloned();
        if frame.is_some() {
            self.cursor += 1;
        }
        Ok(frame)
    }

    fn rewind(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }
}

#[cfg(feature = "video-ffmpeg")]
mod ffmpeg_source {
    use std::{
        path::{Path, PathBuf},
        sync::Arc,
    };

    use anyhow::{Context, Result};
    use ffmpeg_next as ffmpeg;
    use image::RgbaImage;

    use super::VideoSource;

    pub struct FfmpegSource {
        path: PathBuf,
        input: ffmpeg::format::context::Input,
        decoder: ffmpeg::decoder::Video,
        scaler: ffmpeg::software::scaling::Context,
        stream_index: usize,
        eof_sent: bool,
    }

    impl FfmpegSource {
        pub fn open(path: &Path) -> Result<Self> {
            ffmpeg::init().context("failed to initialize FFmpeg")?;

            let input = ffmpeg::format::input(&path)
                .with_context(|| format!("failed to open video {}", path.display()))?;

            let (stream_index, parameters) = {
                let stream = input
                    .streams()
                    .best(ffmpeg::media::Type::Video)
                    .with_context(|| format!("no video stream in {}", path.display()))?;
                (stream.index(), stream.parameters())
            };

            let decoder = ffmpeg::codec::context::Context::from_parameters(parameters)
                .context("failed to create codec context")?
                .decoder()
                .video()
                .context("failed to create video decoder")?;

            let scaler = ffmpeg::software::scaling::Context::get(
                decoder.format(),
                decoder.width(),
                decoder.height(),
                ffmpeg::format::Pixel::RGBA,
                decoder.width(),
                decoder.height(),
                ffmpeg::software::scaling::flag::Flags::BILINEAR,
            )
            .context("failed to create RGBA scaler")?;

            Ok(Self {
                path: path.to_path_buf(),
                input,
                decoder,
                scaler,
                stream_index,
                eof_sent: false,
            })
        }
    }

    impl VideoSource for FfmpegSource {
        fn next_frame(&mut self) -> Result<Option<Arc<RgbaImage>>> {
            let mut decoded = ffmpeg::util::frame::video::Video::empty();

            loop {
                if self.decoder.receive_frame(&mut decoded).is_ok() {
                    let mut rgba = ffmpeg::util::frame::video::Video::empty();
                    self.scaler
                        .run(&decoded, &mut rgba)
                        .context("failed to convert video frame to RGBA")?;
                    return Ok(Some(Arc::new(frame_to_image(&rgba)?)));
                }

                if self.eof_sent {
                    return Ok(None);
                }

                let packet = self
                    .input
                    .packets()
                    .next()
                    .map(|(stream, packet)| (stream.index(), packet));

                match packet {
                    Some((index, packet)) if index == self.stream_index => {
                        self.decoder
                            .send_packet(&packet)
                            .context("failed to feed video packet")?;
                    }
                    Some(_) => {}
                    None => {
                        self.decoder.send_eof().context("failed to drain decoder")?;
                        self.eof_sent = true;
                    }
                }
            }
        }

        fn rewind(&mut self) -> Result<()> {
            if let Err(err) = self.input.seek(0, ..i64::MAX) {
                log::debug!(
                    "seek failed for {}, reopening: {err}",
                    self.path.display()
                );
                *self = Self::open(&self.path.clone())?;
                return Ok(());
            }
            self.decoder.flush();
            self.eof_sent = false;
            Ok(())
        }
    }

    fn frame_to_image(frame: &ffmpeg::util::frame::video::Video) -> Result<RgbaImage> {
        let width = frame.width();
        let height = frame.height();
        let stride = frame.stride(0);
        let row_len = width as usize * 4;
        let data = frame.data(0);

        let mut rgba = Vec::with_capacity(row_len * height as usize);
        for row in data.chunks(stride).take(height as usize) {
            rgba.extend_from_slice(&row[..row_len]);
        }

        RgbaImage::from_raw(width, height, rgba).context("video frame buffer has wrong size")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use image::{Delay, Frame as AnimationFrame, Rgba, codecs::gif::GifEncoder};

    use super::*;

    /// In-memory clip of solid frames, one shade per frame.
    pub(crate) struct SolidClip {
        shades: Vec<u8>,
        cursor: usize,
    }

    impl SolidClip {
        pub(crate) fn new(shades: &[u8]) -> Self {
            Self {
                shades: shades.to_vec(),
                cursor: 0,
            }
        }
    }

    impl VideoSource for SolidClip {
        fn next_frame(&mut self) -> Result<Option<Arc<RgbaImage>>> {
            let Some(&shade) = self.shades.get(self.cursor) else {
                return Ok(None);
            };
            self.cursor += 1;
            Ok(Some(Arc::new(RgbaImage::from_pixel(
                4,
                4,
                Rgba([shade, shade, shade, 255]),
            ))))
        }

        fn rewind(&mut self) -> Result<()> {
            self.cursor = 0;
            Ok(())
        }
    }

    enum Breakage {
        Decode,
        Rewind,
    }

    /// Plays its shades once, then fails the way a damaged file would.
    struct BrokenClip {
        clip: SolidClip,
        breakage: Breakage,
    }

    impl VideoSource for BrokenClip {
        fn next_frame(&mut self) -> Result<Option<Arc<RgbaImage>>> {
            match (self.clip.next_frame()?, &self.breakage) {
                (Some(frame), _) => Ok(Some(frame)),
                (None, Breakage::Decode) => anyhow::bail!("corrupt packet"),
                (None, Breakage::Rewind) => Ok(None),
            }
        }

        fn rewind(&mut self) -> Result<()> {
            match self.breakage {
                Breakage::Rewind => anyhow::bail!("seek failed"),
                Breakage::Decode => self.clip.rewind(),
            }
        }
    }

    fn shade(frame: &RgbaImage) -> u8 {
        frame.get_pixel(0, 0).0[0]
    }

    #[test]
    fn loops_back_to_first_frame_after_end_of_stream() {
        let mut video = LoopingVideo::new(Box::new(SolidClip::new(&[10, 20, 30]))).unwrap();
        let shades: Vec<u8> = (0..7).map(|_| shade(&video.next_frame())).collect();
        assert_eq!(shades, vec![10, 20, 30, 10, 20, 30, 10]);
    }

    #[test]
    fn single_frame_clip_repeats_forever() {
        let mut video = LoopingVideo::new(Box::new(SolidClip::new(&[42]))).unwrap();
        for _ in 0..5 {
            assert_eq!(shade(&video.next_frame()), 42);
        }
    }

    #[test]
    fn decode_error_repeats_last_good_frame() {
        let clip = BrokenClip {
            clip: SolidClip::new(&[10, 20]),
            breakage: Breakage::Decode,
        };
        let mut video = LoopingVideo::new(Box::new(clip)).unwrap();
        let shades: Vec<u8> = (0..5).map(|_| shade(&video.next_frame())).collect();
        assert_eq!(shades, vec![10, 20, 20, 20, 20]);
    }

    #[test]
    fn failed_rewind_repeats_last_good_frame() {
        let clip = BrokenClip {
            clip: SolidClip::new(&[10, 20, 30]),
            breakage: Breakage::Rewind,
        };
        let mut video = LoopingVideo::new(Box::new(clip)).unwrap();
        let shades: Vec<u8> = (0..6).map(|_| shade(&video.next_frame())).collect();
        assert_eq!(shades, vec![10, 20, 30, 30, 30, 30]);
    }

    #[test]
    fn empty_clip_is_rejected() {
        assert!(LoopingVideo::new(Box::new(SolidClip::new(&[]))).is_err());
    }

    #[test]
    fn extension_decides_video() {
        assert!(is_video_path(Path::new("laughing.mp4")));
        assert!(is_video_path(Path::new("clip.MOV")));
        assert!(is_video_path(Path::new("spin.gif")));
        assert!(!is_video_path(Path::new("default.jpg")));
        assert!(!is_video_path(Path::new("noext")));
    }

    #[test]
    fn gif_source_loops_decoded_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.gif");
        {
            let file = File::create(&path).unwrap();
            let mut encoder = GifEncoder::new(file);
            for value in [0u8, 255u8] {
                let buffer = RgbaImage::from_pixel(8, 8, Rgba([value, value, value, 255]));
                encoder
                    .encode_frame(AnimationFrame::from_parts(
                        buffer,
                        0,
                        0,
                        Delay::from_numer_denom_ms(100, 1),
                    ))
                    .unwrap();
            }
        }

        let mut video = LoopingVideo::new(open_video(&path).unwrap()).unwrap();
        let first = shade(&video.next_frame());
        let second = shade(&video.next_frame());
        let wrapped = shade(&video.next_frame());
        assert!(first < 10);
        assert!(second > 245);
        assert_eq!(wrapped, first);
    }
    /// Encodes solid grey frames of the given luma as MPEG-4 in an AVI file.
    #[cfg(feature = "video-ffmpeg")]
    fn write_mpeg4_clip(path: &Path, lumas: &[u8]) {
        use ffmpeg_next as ffmpeg;

        const SIZE: u32 = 16;
        ffmpeg::init().unwrap();

        let mut output = ffmpeg::format::output(&path).unwrap();
        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::MPEG4).unwrap();
        let global_header = output
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER);

        let mut encoder = ffmpeg::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        encoder.set_width(SIZE);
        encoder.set_height(SIZE);
        encoder.set_format(ffmpeg::format::Pixel::YUV420P);
        encoder.set_time_base((1, 10));
        encoder.set_frame_rate(Some((10, 1)));
        if global_header {
            encoder.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
        }
        let mut encoder = encoder.open_as(codec).unwrap();

        let stream_index = {
            let mut stream = output.add_stream(codec).unwrap();
            stream.set_parameters(&encoder);
            stream.set_time_base((1, 10));
            stream.index()
        };
        output.write_header().unwrap();
        let stream_time_base = output.stream(stream_index).unwrap().time_base();

        for (pts, &luma) in lumas.iter().enumerate() {
            let mut frame = ffmpeg::util::frame::video::Video::new(
                ffmpeg::format::Pixel::YUV420P,
                SIZE,
                SIZE,
            );
            frame.data_mut(0).fill(luma);
            frame.data_mut(1).fill(128);
            frame.data_mut(2).fill(128);
            frame.set_pts(Some(pts as i64));
            encoder.send_frame(&frame).unwrap();
            write_packets(&mut encoder, &mut output, stream_index, stream_time_base);
        }
        encoder.send_eof().unwrap();
        write_packets(&mut encoder, &mut output, stream_index, stream_time_base);
        output.write_trailer().unwrap();
    }

    #[cfg(feature = "video-ffmpeg")]
    fn write_packets(
        encoder: &mut ffmpeg_next::encoder::video::Encoder,
        output: &mut ffmpeg_next::format::context::Output,
        stream_index: usize,
        time_base: ffmpeg_next::Rational,
    ) {
        let mut packet = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(stream_index);
            packet.rescale_ts((1, 10), time_base);
            packet.write_interleaved(output).unwrap();
        }
    }

    #[cfg(feature = "video-ffmpeg")]
    #[test]
    fn ffmpeg_clip_wraps_to_first_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.avi");
        write_mpeg4_clip(&path, &[40, 200, 40]);

        let mut video = LoopingVideo::new(open_video(&path).unwrap()).unwrap();
        let shades: Vec<u8> = (0..7).map(|_| shade(&video.next_frame())).collect();
        let dark: Vec<bool> = shades.iter().map(|&value| value < 100).collect();
        assert_eq!(
            dark,
            vec![true, false, true, true, false, true, true],
            "shades: {shades:?}"
        );
    }
}
