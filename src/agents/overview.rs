use anyhow::Result;

use crate::config::LlmConfig;
use crate::llm::chat::{complete, ImageSource, Prompt};
use crate::llm::structured::parse_json_object;
use crate::models::MemeOverview;

const OVERVIEW_TEMPERATURE: f32 = 0.7;

fn system_prompt() -> &'static str {
    "You are an expert annotator of internet memes, many of them in Bengali. \
     Look at the meme image and describe it for a research dataset.\n\
     Respond with ONLY a JSON object with these keys:\n\
     - \"explanation\": a brief explanation of the meme, pointing out where the humor lies\n\
     - \"genre\": one of \"political\", \"entertainment\", \"sports\", \"other\"\n\
     - \"heroes\": list of entities portrayed as heroes\n\
     - \"villains\": list of entities portrayed as villains\n\
     - \"victims\": list of entities portrayed as victims\n\
     - \"other_roles\": list of any other entities that play a role\n\
     - \"sentiment\": one of \"positive\", \"negative\", \"neutral\"\n\
     Use empty lists when a role is absent. Keep Bengali names in Bengali script."
}

/// Produce an overview of the meme at `image_url`.
///
/// `Ok(None)` means the model answered but not in the expected shape.
pub async fn meme_overview(
    client: &reqwest::Client,
    config: &LlmConfig,
    image_url: &str,
) -> Result<Option<MemeOverview>> {
    let prompt = Prompt::new("Annotate this meme.")
        .system(system_prompt())
        .image(ImageSource::Url(image_url.to_string()))
        .temperature(OVERVIEW_TEMPERATURE)
        .json();

    let response = complete(client, config, &config.vision_model, prompt).await?;
    let overview = parse_json_object::<MemeOverview>(&response);
    tracing::debug!("Overview for {image_url}: {overview:?}");
    Ok(overview)
}
