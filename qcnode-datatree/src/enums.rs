//! String-keyed domain enums used throughout the descriptor family and
//! config surfaces. The source keeps these as plain C enums serialized to
//! their lower/snake_case spelling in the config text; `parse`/`as_str`
//! reproduce that mapping so `DataTree::get_image_format` et al. behave
//! the same as the source's string-to-enum lookup tables.

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),* $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)*
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)*
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some(Self::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

string_enum!(ImageFormat {
    Rgb => "rgb",
    Bgr => "bgr",
    Uyvy => "uyvy",
    Nv12 => "nv12",
    Nv12Ubwc => "nv12_ubwc",
    P010 => "p010",
    Tp10Ubwc => "tp10_ubwc",
    H264 => "h264",
    H265 => "h265",
    Max => "max",
});

string_enum!(TensorType {
    Int8 => "int8",
    Int16 => "int16",
    Int32 => "int32",
    Int64 => "int64",
    UInt8 => "uint8",
    UInt16 => "uint16",
    UInt32 => "uint32",
    UInt64 => "uint64",
    Float16 => "float16",
    Float32 => "float32",
    Float64 => "float64",
    SFixedPoint8 => "sfixed_point8",
    SFixedPoint16 => "sfixed_point16",
    SFixedPoint32 => "sfixed_point32",
    UFixedPoint8 => "ufixed_point8",
    UFixedPoint16 => "ufixed_point16",
    UFixedPoint32 => "ufixed_point32",
    Max => "max",
});

string_enum!(ProcessorType {
    Htp0 => "htp0",
    Htp1 => "htp1",
    Cpu => "cpu",
    Gpu => "gpu",
    Max => "max",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_strings() {
        assert_eq!(ImageFormat::parse("rgb"), Some(ImageFormat::Rgb));
        assert_eq!(ImageFormat::Rgb.as_str(), "rgb");
        assert_eq!(ProcessorType::parse("htp0"), Some(ProcessorType::Htp0));
    }

    #[test]
    fn unknown_string_is_none() {
        assert_eq!(ImageFormat::parse("not-a-format"), None);
    }
}
