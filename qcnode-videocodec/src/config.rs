//! Static configuration surface for both codec roles (spec §4.G.1),
//! grounded in `VidcNodeBase_Config_t` and
//! `VidcNodeBaseConfigIfs::ParseStaticConfig`.

use qcnode_datatree::{DataTree, ImageFormat};
use qcnode_node::StaticConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecRole {
    Encoder,
    Decoder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressedFormat {
    H264,
    Hevc,
}

impl CompressedFormat {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "h264" => Some(Self::H264),
            "hevc" | "h265" => Some(Self::Hevc),
            _ => None,
        }
    }
}

/// One side of the codec's `inFormat`/`outFormat` pair: exactly one side
/// is compressed, the other an uncompressed image format (spec §4.G.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTag {
    Uncompressed(ImageFormat),
    Compressed(CompressedFormat),
}

impl FormatTag {
    fn is_compressed(self) -> bool {
        matches!(self, FormatTag::Compressed(_))
    }

    fn parse(s: &str) -> Option<Self> {
        CompressedFormat::parse(s)
            .map(FormatTag::Compressed)
            .or_else(|| ImageFormat::parse(s).map(FormatTag::Uncompressed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateControlMode {
    CbrCfr,
    CbrVfr,
    VbrCfr,
    Unused,
}

impl RateControlMode {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "CBR_CFR" => Some(Self::CbrCfr),
            "CBR_VFR" => Some(Self::CbrVfr),
            "VBR_CFR" => Some(Self::VbrCfr),
            "UNUSED" => Some(Self::Unused),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecProfile {
    H264Baseline,
    H264High,
    H264Main,
    HevcMain,
    HevcMain10,
}

impl CodecProfile {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "H264_BASELINE" => Some(Self::H264Baseline),
            "H264_HIGH" => Some(Self::H264High),
            "H264_MAIN" => Some(Self::H264Main),
            "HEVC_MAIN" => Some(Self::HevcMain),
            "HEVC_MAIN10" => Some(Self::HevcMain10),
            _ => None,
        }
    }
}

/// Encoder-only fields, absent for a decoder's config (spec §4.G.1).
#[derive(Debug, Clone, Copy)]
pub struct EncoderFields {
    pub bit_rate: u32,
    pub gop: u32,
    pub rate_control_mode: RateControlMode,
    pub profile: CodecProfile,
}

#[derive(Debug, Clone)]
pub struct CodecConfig {
    pub common: StaticConfig,
    pub role: CodecRole,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub input_dynamic_mode: bool,
    pub output_dynamic_mode: bool,
    pub num_input_buffer_req: u32,
    pub num_output_buffer_req: u32,
    pub in_format: FormatTag,
    pub out_format: FormatTag,
    pub encoder: Option<EncoderFields>,
}

impl CodecConfig {
    /// The codec bitstream the non-uncompressed side names.
    pub fn codec_type(&self) -> Option<CompressedFormat> {
        match (self.in_format, self.out_format) {
            (FormatTag::Compressed(c), _) | (_, FormatTag::Compressed(c)) => Some(c),
            _ => None,
        }
    }
}

/// Mirrors `VidcNodeBaseConfigIfs::ParseStaticConfig`: every missing or
/// zero-valued required field accumulates a message in `errors` and the
/// call fails with the first accumulated error kept authoritative.
pub fn parse_static(role: CodecRole, tree: &DataTree, errors: &mut Vec<String>) -> Result<CodecConfig, String> {
    let common = qcnode_node::ConfigShim::read_common_static(tree, errors)?;

    let width = tree.get("width", 0u32);
    let height = tree.get("height", 0u32);
    let frame_rate = tree.get("frameRate", 0u32);
    let input_dynamic_mode = tree.get("inputDynamicMode", true);
    let output_dynamic_mode = tree.get("outputDynamicMode", false);
    let num_input_buffer_req = tree.get("numInputBufferReq", 0u32);
    let num_output_buffer_req = tree.get("numOutputBufferReq", 0u32);

    let in_format_str: String = tree.get("inFormat", String::new());
    let out_format_str: String = tree.get("outFormat", String::new());
    let in_format = FormatTag::parse(&in_format_str);
    let out_format = FormatTag::parse(&out_format_str);

    let mut ok = true;

    if width == 0 {
        errors.push("static.width is zero".to_owned());
        ok = false;
    }
    if height == 0 {
        errors.push("static.height is zero".to_owned());
        ok = false;
    }
    if frame_rate == 0 {
        errors.push("static.frameRate is zero".to_owned());
        ok = false;
    }
    if !input_dynamic_mode && num_input_buffer_req == 0 {
        errors.push("static.numInputBufferReq is zero in static input mode".to_owned());
        ok = false;
    }
    if !output_dynamic_mode && num_output_buffer_req == 0 {
        errors.push("static.numOutputBufferReq is zero in static output mode".to_owned());
        ok = false;
    }

    let (in_format, out_format) = match (in_format, out_format) {
        (Some(i), Some(o)) => (i, o),
        _ => {
            errors.push("static.inFormat/outFormat is invalid".to_owned());
            return Err("invalid in/out format".to_owned());
        }
    };

    if in_format.is_compressed() == out_format.is_compressed() {
        errors.push("exactly one of inFormat/outFormat must be a compressed format".to_owned());
        ok = false;
    }

    let role_matches_compressed_side = match role {
        CodecRole::Encoder => out_format.is_compressed(),
        CodecRole::Decoder => in_format.is_compressed(),
    };
    if !role_matches_compressed_side {
        errors.push("compressed side does not match codec role".to_owned());
        ok = false;
    }

    let encoder = match role {
        CodecRole::Encoder => {
            let bit_rate = tree.get("bitRate", 0u32);
            let gop = tree.get("gop", 0u32);
            let rate_control_mode = RateControlMode::parse(&tree.get("rateControlMode", String::new()))
                .unwrap_or(RateControlMode::Unused);
            let profile = match CodecProfile::parse(&tree.get("profile", String::new())) {
                Some(p) => p,
                None => {
                    errors.push("static.profile is invalid".to_owned());
                    ok = false;
                    CodecProfile::H264Main
                }
            };
            Some(EncoderFields {
                bit_rate,
                gop,
                rate_control_mode,
                profile,
            })
        }
        CodecRole::Decoder => None,
    };

    if !ok {
        return Err("codec static config rejected".to_owned());
    }

    Ok(CodecConfig {
        common,
        role,
        width,
        height,
        frame_rate,
        input_dynamic_mode,
        output_dynamic_mode,
        num_input_buffer_req,
        num_output_buffer_req,
        in_format,
        out_format,
        encoder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder_text() -> &'static str {
        "[static]\n\
         name = \"dec0\"\n\
         id = 1\n\
         width = 1920\n\
         height = 1080\n\
         frameRate = 30\n\
         inputDynamicMode = true\n\
         outputDynamicMode = true\n\
         inFormat = \"h264\"\n\
         outFormat = \"nv12\"\n"
    }

    #[test]
    fn parses_valid_decoder_config() {
        let tree = DataTree::from_str(decoder_text()).unwrap();
        let mut sub = DataTree::new();
        tree.get_subtree("static", &mut sub);
        let mut errors = Vec::new();
        let cfg = parse_static(CodecRole::Decoder, &sub, &mut errors).unwrap();
        assert_eq!(cfg.width, 1920);
        assert_eq!(cfg.codec_type(), Some(CompressedFormat::H264));
        assert!(cfg.encoder.is_none());
    }

    #[test]
    fn rejects_both_sides_compressed() {
        let text = "[static]\nname=\"d\"\nid=1\nwidth=1\nheight=1\nframeRate=1\n\
                     inFormat=\"h264\"\noutFormat=\"hevc\"\n";
        let tree = DataTree::from_str(text).unwrap();
        let mut sub = DataTree::new();
        tree.get_subtree("static", &mut sub);
        let mut errors = Vec::new();
        assert!(parse_static(CodecRole::Decoder, &sub, &mut errors).is_err());
    }

    #[test]
    fn static_mode_requires_nonzero_buffer_counts() {
        let text = "[static]\nname=\"d\"\nid=1\nwidth=1\nheight=1\nframeRate=1\n\
                     inputDynamicMode=false\nnumInputBufferReq=0\n\
                     inFormat=\"h264\"\noutFormat=\"nv12\"\n";
        let tree = DataTree::from_str(text).unwrap();
        let mut sub = DataTree::new();
        tree.get_subtree("static", &mut sub);
        let mut errors = Vec::new();
        assert!(parse_static(CodecRole::Decoder, &sub, &mut errors).is_err());
        assert!(errors.iter().any(|e| e.contains("numInputBufferReq")));
    }

    #[test]
    fn encoder_requires_valid_profile() {
        let text = "[static]\nname=\"e\"\nid=1\nwidth=1\nheight=1\nframeRate=1\n\
                     inFormat=\"nv12\"\noutFormat=\"h264\"\nprofile=\"bogus\"\n";
        let tree = DataTree::from_str(text).unwrap();
        let mut sub = DataTree::new();
        tree.get_subtree("static", &mut sub);
        let mut errors = Vec::new();
        assert!(parse_static(CodecRole::Encoder, &sub, &mut errors).is_err());
    }
}
