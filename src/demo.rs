//! Demo requests, one per response parser.

use color_eyre::eyre::{Result, eyre};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use volea::application::parsers::{
    ImageParser, JsonArrayParser, JsonObjectParser, PullXmlParser, StringParser, TypedParser,
    XmlEventType,
};
use volea::domain::entities::{DecodeConfig, Request};
use volea::infrastructure::{ClientContext, DemoCommand, RequestHandle};

/// Weather report returned by the typed demo endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Weather {
    weather_info: WeatherInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WeatherInfo {
    city: String,
    city_id: String,
    temp: String,
    wd: String,
    ws: String,
    sd: String,
    time: String,
}

impl std::fmt::Display for Weather {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let info = &self.weather_info;
        write!(
            f,
            "{} ({}) at {}: {}°C, wind {} {}, humidity {}",
            info.city, info.city_id, info.time, info.temp, info.wd, info.ws, info.sd
        )
    }
}

/// Runs one demo command against the shared context.
pub async fn run(context: &ClientContext, command: DemoCommand) -> Result<()> {
    let queue = context.queue();

    match command {
        DemoCommand::String { url } => {
            let text = deliver(queue.submit(Request::get(url), StringParser::new())).await?;
            println!("{text}");
        }
        DemoCommand::Post { url, params } => {
            let mut request = Request::post(url);
            for param in &params {
                let (key, value) = param
                    .split_once('=')
                    .ok_or_else(|| eyre!("expected KEY=VALUE, got {param:?}"))?;
                request = request.with_form_param(key, value);
            }
            let text = deliver(queue.submit(request, StringParser::new())).await?;
            println!("{text}");
        }
        DemoCommand::JsonObject { url } => {
            let object = deliver(queue.submit(Request::get(url), JsonObjectParser)).await?;
            println!("{}", serde_json::to_string_pretty(&Value::Object(object))?);
        }
        DemoCommand::JsonArray { url } => {
            let array = deliver(queue.submit(Request::get(url), JsonArrayParser)).await?;
            info!(len = array.len(), "Received JSON array");
            println!("{}", serde_json::to_string_pretty(&Value::Array(array))?);
        }
        DemoCommand::Typed { url } => {
            let weather =
                deliver(queue.submit(Request::get(url), TypedParser::<Weather>::new())).await?;
            println!("{weather}");
        }
        DemoCommand::Xml { url, element } => {
            let mut cursor = deliver(queue.submit(Request::get(url), PullXmlParser)).await?;
            while cursor.next_event()? != XmlEventType::EndDocument {
                if cursor.event_type() == XmlEventType::StartTag
                    && cursor.name() == Some(element.as_str())
                {
                    println!("{element}: {}", cursor.attribute_value(0).unwrap_or_default());
                }
            }
        }
        DemoCommand::Image {
            url,
            max_width,
            max_height,
            color,
        } => {
            let parser =
                ImageParser::new(DecodeConfig::new(color).with_max_size(max_width, max_height));
            let bitmap = deliver(queue.submit(Request::get(url), parser)).await?;
            println!(
                "{}x{} {} ({} bytes)",
                bitmap.width(),
                bitmap.height(),
                bitmap.color(),
                bitmap.byte_count()
            );
        }
        DemoCommand::ImageLoader {
            url,
            max_width,
            max_height,
        } => {
            let loader = context.image_loader();
            for pass in 1..=2 {
                let cached = loader.cached(&url, max_width, max_height).is_some();
                let bitmap = loader
                    .get(&url, max_width, max_height)
                    .await
                    .ok_or_else(|| eyre!("image load was cancelled"))??;
                println!(
                    "pass {pass}: {}x{} ({} bytes, cached: {cached})",
                    bitmap.width(),
                    bitmap.height(),
                    bitmap.byte_count()
                );
            }
            println!("{}", context.image_cache().stats());
        }
    }

    Ok(())
}

async fn deliver<T>(handle: RequestHandle<T>) -> Result<T> {
    let id = handle.id();
    let response = handle
        .response()
        .await
        .ok_or_else(|| eyre!("request {id} was cancelled"))??;
    if let Some(cache) = response.cache() {
        info!(id = %id, etag = ?cache.etag, expires = ?cache.expires, "Response is cacheable");
    }
    Ok(response.into_value())
}
