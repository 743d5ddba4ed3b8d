use super::app_config::LogLevel;
use crate::domain::entities::ColorDepth;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const STRING_URL: &str = "https://www.baidu.com";
const JSON_OBJECT_URL: &str = "http://wanandroid.com/tools/mockapi/1921/zhuanghongjiJsonObjectRequest";
const JSON_ARRAY_URL: &str = "http://wanandroid.com/tools/mockapi/1921/zhuanghongjiJsonArrayRequest";
const TYPED_URL: &str = "http://wanandroid.com/tools/mockapi/1921/zhuanghongjiGsonRequest";
const XML_URL: &str = "http://wanandroid.com/tools/mockapi/1921/zhuanghongjiXmlRequest";
const IMAGE_URL: &str = "http://www.wanandroid.com/resources/image/pc/logo.png";

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "volea",
    version,
    about = "Asynchronous HTTP request queue with pluggable response parsers",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Maximum concurrently executing requests.
    #[arg(long, global = true)]
    pub max_workers: Option<usize>,

    /// Client-wide request timeout in seconds.
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Bitmap cache bound in bytes.
    #[arg(long, global = true)]
    pub cache_bytes: Option<usize>,

    /// Request to run.
    #[command(subcommand)]
    pub command: DemoCommand,
}

/// Demo requests, one per response parser.
#[derive(Debug, Clone, Subcommand)]
pub enum DemoCommand {
    /// GET a page as text.
    String {
        #[arg(default_value = STRING_URL)]
        url: String,
    },
    /// POST form parameters and print the text response.
    Post {
        #[arg(default_value = STRING_URL)]
        url: String,
        /// Form parameters as `key=value`. Later keys replace earlier ones.
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
    /// GET a JSON object.
    JsonObject {
        #[arg(default_value = JSON_OBJECT_URL)]
        url: String,
    },
    /// GET a JSON array.
    JsonArray {
        #[arg(default_value = JSON_ARRAY_URL)]
        url: String,
    },
    /// GET a weather report deserialized into a typed model.
    Typed {
        #[arg(default_value = TYPED_URL)]
        url: String,
    },
    /// GET an XML document and walk it with the pull cursor.
    Xml {
        #[arg(default_value = XML_URL)]
        url: String,
        /// Print the first attribute of every element with this name.
        #[arg(short, long, default_value = "city")]
        element: String,
    },
    /// GET and decode an image.
    Image {
        #[arg(default_value = IMAGE_URL)]
        url: String,
        /// Maximum decoded width, 0 for unbounded.
        #[arg(long, default_value_t = 0)]
        max_width: u32,
        /// Maximum decoded height, 0 for unbounded.
        #[arg(long, default_value_t = 0)]
        max_height: u32,
        /// Decoded pixel layout.
        #[arg(long, default_value = "rgba8")]
        color: ColorDepth,
    },
    /// Load an image twice through the cached loader.
    ImageLoader {
        #[arg(default_value = IMAGE_URL)]
        url: String,
        /// Maximum decoded width, 0 for unbounded.
        #[arg(long, default_value_t = 200)]
        max_width: u32,
        /// Maximum decoded height, 0 for unbounded.
        #[arg(long, default_value_t = 200)]
        max_height: u32,
    },
}
