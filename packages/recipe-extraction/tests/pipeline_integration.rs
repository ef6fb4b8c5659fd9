//! End-to-end pipeline tests against in-memory collaborators.

use std::time::Duration;

use recipe_extraction::extractors::schema_org;
use recipe_extraction::pipeline::{
    match_ingredient, parse_recipe_response, resolve_ingredient, AIIngredient,
};
use recipe_extraction::testing::{MockAI, MockFetchCall, MockFetcher, TestScenario};
use recipe_extraction::{
    ExtractionError, FetchError, Ingredient, IngredientCategory, Layer, NewIngredient,
    PipelineConfig, RecipeInput, SiteExtractor, VocabularySnapshot, XiachufangExtractor,
};

const RECIPE_PROMPT_KEY: &str = "专业的菜谱解析助手";
const INGREDIENT_LINES_KEY: &str = "数量和单位";
const CATEGORIZE_KEY: &str = "分配合适的分类";

const TOMATO_EGG_JSON: &str = r#"{"@type":"Recipe","name":"番茄炒蛋","recipeIngredient":["番茄 2个","鸡蛋 3个"],"recipeInstructions":["切番茄","炒鸡蛋","混合"]}"#;

fn json_ld_page(json: &str) -> String {
    format!(
        r#"<html><head><script type="application/ld+json">{json}</script></head>
        <body><nav>首页</nav><p>广告</p></body></html>"#
    )
}

#[tokio::test]
async fn test_structured_data_page_end_to_end() {
    let url = "https://recipes.example.com/r/1";
    let scenario = TestScenario::new()
        .with_page(url, &json_ld_page(TOMATO_EGG_JSON))
        .with_ingredient("番茄", IngredientCategory::Vegetable)
        .with_ingredient("鸡蛋", IngredientCategory::EggDairy)
        .with_ai_response(
            INGREDIENT_LINES_KEY,
            r#"{"ingredients":[{"name":"番茄","count":2,"unit":"piece"},{"name":"鸡蛋","count":3,"unit":"piece"}]}"#,
        )
        .build();

    let recipe = scenario.pipeline.parse_url(url).await.unwrap();

    assert_eq!(recipe.name.as_deref(), Some("番茄炒蛋"));
    assert_eq!(recipe.ingredients.len(), 2);
    assert!(recipe.ingredients.iter().all(|i| i.matched_ingredient_id.is_some()));
    assert!(recipe.ingredients.iter().all(|i| i.matched_unit_id.is_some()));
    assert_eq!(recipe.ingredients[1].count, Some(3.0));

    let steps: Vec<&str> = recipe.steps.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(steps, vec!["切番茄", "炒鸡蛋", "混合"]);
    assert!(recipe.steps.iter().all(|s| s.image_url.is_none() && s.image_id.is_none()));

    // Nothing new was created and no full-recipe inference was needed.
    assert!(recipe.newly_created_ingredients.is_none());
    let calls = scenario.ai.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].prompt.contains("番茄 2个"));
    assert_eq!(scenario.fetcher.calls(), vec![MockFetchCall::Page { url: url.to_string() }]);
}

#[test]
fn test_structured_data_extracted_recipe_shape() {
    let recipe = schema_org::extract(&json_ld_page(TOMATO_EGG_JSON)).unwrap();

    assert_eq!(recipe.name.as_deref(), Some("番茄炒蛋"));
    assert_eq!(recipe.ingredients.len(), 2);
    assert_eq!(recipe.steps.len(), 3);
    assert!(recipe.steps.iter().all(|s| !s.text.is_empty() && s.image_url.is_none()));
}

#[test]
fn test_embedded_json_shapes_are_equivalent() {
    let object = json_ld_page(TOMATO_EGG_JSON);
    let array = json_ld_page(&format!(r#"[{{"@type":"WebPage"}},{TOMATO_EGG_JSON}]"#));
    let graph = json_ld_page(&format!(
        r#"{{"@context":"https://schema.org","@graph":[{{"@type":"Organization","name":"站点"}},{TOMATO_EGG_JSON}]}}"#
    ));

    let expected = schema_org::extract(&object).unwrap();
    assert_eq!(schema_org::extract(&array).unwrap(), expected);
    assert_eq!(schema_org::extract(&graph).unwrap(), expected);
}

#[tokio::test]
async fn test_fenced_inference_reply_is_parsed() {
    let url = "https://blog.example.com/hongshaorou";
    let page = r#"<html><body>
        <header>我的博客</header>
        <article><h1>红烧肉</h1><p>五花肉500克，冰糖适量。</p><p>焯水后炒糖色，再炖一小时。</p></article>
        <footer>版权所有</footer>
    </body></html>"#;
    let reply = "好的，以下是菜谱：\n```json\n{\"name\":\"红烧肉\",\"ingredients\":[{\"name\":\"五花肉\",\"count\":500,\"unit\":\"g\"},{\"name\":\"冰糖\",\"count\":null,\"unit\":null}],\"steps\":[{\"text\":\"焯水\"},\"炒糖色\",{\"text\":\"炖一小时\"}]}\n```";

    let scenario = TestScenario::new()
        .with_page(url, page)
        .with_ingredient("五花肉", IngredientCategory::Meat)
        .with_ai_response(RECIPE_PROMPT_KEY, reply)
        .with_ai_response(CATEGORIZE_KEY, r#"{"ingredients":[{"name":"冰糖","category":"调料"}]}"#)
        .build();

    let recipe = scenario.pipeline.parse_url(url).await.unwrap();

    assert_eq!(recipe.name.as_deref(), Some("红烧肉"));
    assert_eq!(recipe.steps.len(), 3);
    assert_eq!(recipe.steps[1].text, "炒糖色");

    let pork = &recipe.ingredients[0];
    assert_eq!(pork.count, Some(500.0));
    assert!(pork.matched_unit_id.is_some());

    // 冰糖 is "to taste" and was auto-created.
    let sugar = &recipe.ingredients[1];
    assert!(sugar.is_to_taste());
    assert!(sugar.matched_ingredient_id.is_some());
    assert_eq!(
        recipe.newly_created_ingredients,
        Some(vec![NewIngredient {
            name: "冰糖".into(),
            category: IngredientCategory::Seasoning,
        }])
    );
    assert_eq!(scenario.vocabulary.ingredient_count(), 2);

    // The reduced page text reached the model, the boilerplate did not.
    let recipe_call = &scenario.ai.calls()[0];
    assert!(recipe_call.prompt.contains("焯水后炒糖色"));
    assert!(!recipe_call.prompt.contains("版权所有"));
    assert!(recipe_call.system.as_deref().unwrap().contains("五花肉"));
}

#[test]
fn test_fenced_reply_balanced_brace_scan() {
    let reply = "```json\n{\"name\":\"凉拌黄瓜\",\"ingredients\":[],\"steps\":[\"拍黄瓜 {用刀背}\"]}\n```";
    let parsed = parse_recipe_response(reply).unwrap();
    assert_eq!(parsed.name.as_deref(), Some("凉拌黄瓜"));
    assert_eq!(parsed.steps[0].text(), "拍黄瓜 {用刀背}");
}

#[tokio::test]
async fn test_null_count_stays_null_through_every_layer() {
    let url = "https://recipes.example.com/salted";
    let json = r#"{"@type":"Recipe","name":"拍黄瓜","recipeIngredient":["黄瓜 2根","盐 适量"],"recipeInstructions":["拍碎","加盐"]}"#;

    let scenario = TestScenario::new()
        .with_page(url, &json_ld_page(json))
        .with_ingredient("黄瓜", IngredientCategory::Vegetable)
        .with_ingredient("盐", IngredientCategory::Seasoning)
        .with_ai_response(
            INGREDIENT_LINES_KEY,
            r#"{"ingredients":[{"name":"黄瓜","count":"2","unit":"root"},{"name":"盐","count":"适量","unit":""}]}"#,
        )
        .build();

    let recipe = scenario.pipeline.parse_url(url).await.unwrap();
    let salt = recipe.ingredients.iter().find(|i| i.name == "盐").unwrap();
    assert_eq!(salt.count, None);
    assert_eq!(salt.unit, None);

    let json = serde_json::to_value(&recipe).unwrap();
    assert!(json["ingredients"][1]["count"].is_null());
    assert_eq!(json["ingredients"][0]["count"], 2.0);
}

#[tokio::test]
async fn test_ingredient_lines_fall_back_locally_when_inference_fails() {
    let url = "https://recipes.example.com/r/2";
    let scenario = TestScenario::new()
        .with_page(url, &json_ld_page(TOMATO_EGG_JSON))
        .with_ingredient("番茄", IngredientCategory::Vegetable)
        .with_ingredient("鸡蛋", IngredientCategory::EggDairy)
        .with_ai(MockAI::new().failing())
        .build();

    let recipe = scenario.pipeline.parse_url(url).await.unwrap();
    assert_eq!(recipe.ingredients[0].name, "番茄");
    assert_eq!(recipe.ingredients[0].count, Some(2.0));
    assert_eq!(recipe.ingredients[0].unit.as_deref(), Some("个"));
    assert_eq!(recipe.steps.len(), 3);
}

#[tokio::test]
async fn test_quantity_first_lines_never_create_numeric_ingredients() {
    let url = "https://baking.example.com/bread";
    let json = r#"{"@type":"Recipe","name":"Bread","recipeIngredient":["2 cups flour","1/2 tsp salt"],"recipeInstructions":["Mix","Bake"]}"#;
    let scenario = TestScenario::new()
        .with_page(url, &json_ld_page(json))
        .with_ingredient("面粉", IngredientCategory::Staple)
        .with_ai(MockAI::new().failing())
        .build();

    let recipe = scenario.pipeline.parse_url(url).await.unwrap();

    let names: Vec<&str> = recipe.ingredients.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["flour", "salt"]);
    assert_eq!(recipe.ingredients[0].count, Some(2.0));
    assert_eq!(recipe.ingredients[1].count, Some(0.5));
    assert_eq!(recipe.ingredients[1].unit.as_deref(), Some("tsp"));

    let created = recipe.newly_created_ingredients.unwrap();
    let created: Vec<&str> = created.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(created, vec!["flour", "salt"]);

    assert_eq!(scenario.vocabulary.ingredient_count(), 3);
    assert!(scenario.vocabulary.find_ingredient("2").is_none());
    assert!(scenario.vocabulary.find_ingredient("1/2").is_none());
}

#[tokio::test]
async fn test_site_extractor_miss_falls_through_to_structured_data() {
    let url = "https://www.xiachufang.com/recipe/1/";
    let html = json_ld_page(TOMATO_EGG_JSON);

    assert!(XiachufangExtractor.extract(&html).is_none());

    let scenario = TestScenario::new().build();
    let result = scenario
        .pipeline
        .extract_from_html(url, &html, &VocabularySnapshot::default())
        .await
        .unwrap();
    assert_eq!(result.layer, Layer::StructuredData);
    assert!(scenario.ai.calls().is_empty());
}

#[tokio::test]
async fn test_site_extractor_downloads_step_images() {
    let url = "https://www.xiachufang.com/recipe/100/";
    let image_url = "https://i2.chuimg.com/step1.jpg?imageView2/2/w/660/interlace/1/q/75";
    let page = r#"<html><body>
        <h1 class="recipe-name">葱油拌面</h1>
        <div class="recipe-ingredient">
          <div class="ing-line"><span class="ing-name">面条</span><span class="ing-amount">200克</span></div>
        </div>
        <div class="step">
          <div class="step-cover" style="background-image: url('//i2.chuimg.com/step1.jpg')"></div>
          <p class="step-text">熬葱油。</p>
        </div>
        <div class="step"><p class="step-text">拌面</p></div>
    </body></html>"#;

    let scenario = TestScenario::new()
        .with_page(url, page)
        .with_image(image_url, b"jpeg-bytes", "image/jpeg")
        .with_ingredient("面条", IngredientCategory::Staple)
        .with_ai_response(
            INGREDIENT_LINES_KEY,
            r#"{"ingredients":[{"name":"面条","count":200,"unit":"g"}]}"#,
        )
        .build();

    let recipe = scenario.pipeline.parse_url(url).await.unwrap();

    assert_eq!(recipe.name.as_deref(), Some("葱油拌面"));
    assert_eq!(recipe.steps[0].text, "熬葱油");
    let local = recipe.steps[0].image_url.as_deref().unwrap();
    assert!(local.starts_with("/media/") && local.ends_with(".jpg"));
    assert!(recipe.steps[0].image_id.is_some());
    assert_eq!(scenario.blobs.get(local).unwrap(), b"jpeg-bytes".to_vec());
    assert!(recipe.steps[1].image_url.is_none());
}

#[tokio::test]
async fn test_one_slow_image_does_not_sink_the_batch() {
    let url = "https://recipes.example.com/with-photos";
    let json = r#"{"@type":"Recipe","name":"蒸蛋","recipeInstructions":[
        {"@type":"HowToStep","text":"打蛋","image":"https://img.example.com/0.png"},
        {"@type":"HowToStep","text":"加水","image":"https://img.example.com/1.png"},
        {"@type":"HowToStep","text":"蒸十分钟","image":"https://img.example.com/2.png"}
    ]}"#;

    let fetcher = MockFetcher::new()
        .with_page(url, json_ld_page(json))
        .with_image("https://img.example.com/0.png", b"0", "image/png")
        .with_image("https://img.example.com/1.png", b"1", "image/png")
        .with_delay("https://img.example.com/1.png", Duration::from_secs(5))
        .with_image("https://img.example.com/2.png", b"2", "image/png");

    let scenario = TestScenario::new()
        .with_fetcher(fetcher)
        .with_config(PipelineConfig::default().with_image_timeout(Duration::from_millis(200)))
        .build();

    let recipe = scenario.pipeline.parse_url(url).await.unwrap();

    assert_eq!(scenario.blobs.len(), 2);
    for index in [0, 2] {
        let step = &recipe.steps[index];
        assert!(step.image_url.as_deref().unwrap().starts_with("/media/"));
        assert!(step.image_id.is_some());
    }
    // The slow image keeps its original URL.
    assert_eq!(
        recipe.steps[1].image_url.as_deref(),
        Some("https://img.example.com/1.png")
    );
    assert!(recipe.steps[1].image_id.is_none());
}

#[tokio::test]
async fn test_image_downloads_can_be_disabled() {
    let url = "https://recipes.example.com/no-downloads";
    let json = r#"{"@type":"Recipe","recipeInstructions":[{"@type":"HowToStep","text":"装盘","image":"https://img.example.com/x.jpg"}]}"#;

    let scenario = TestScenario::new()
        .with_page(url, &json_ld_page(json))
        .with_config(PipelineConfig::default().with_download_images(false))
        .build();

    let recipe = scenario.pipeline.parse_url(url).await.unwrap();
    assert_eq!(recipe.steps[0].image_url.as_deref(), Some("https://img.example.com/x.jpg"));
    assert!(scenario.blobs.is_empty());
    assert_eq!(scenario.fetcher.calls().len(), 1);
}

#[test]
fn test_exact_match_beats_containment_and_is_idempotent() {
    let vocabulary = VocabularySnapshot::new(
        vec![
            Ingredient::new("土鸡蛋", IngredientCategory::EggDairy),
            Ingredient::new("鸡蛋", IngredientCategory::EggDairy),
        ],
        Vec::new(),
    );

    let matched = match_ingredient("鸡蛋", &vocabulary.ingredients).unwrap();
    assert_eq!(matched.name, "鸡蛋");

    let first = resolve_ingredient(AIIngredient::new("鸡蛋"), &vocabulary);
    let second = resolve_ingredient(AIIngredient::new("鸡蛋"), &vocabulary);
    assert_eq!(first.matched_ingredient_id, Some(vocabulary.ingredients[1].id));
    assert_eq!(first.matched_ingredient_id, second.matched_ingredient_id);

    assert!(match_ingredient("神秘食材", &vocabulary.ingredients).is_none());
}

#[tokio::test]
async fn test_unknown_ingredient_always_gets_a_category() {
    let reply = r#"{"name":"怪味菜","ingredients":[{"name":"神秘食材","count":1,"unit":"piece"}],"steps":["做菜"]}"#;
    let ai = MockAI::new()
        .with_response(RECIPE_PROMPT_KEY, reply)
        .with_response(CATEGORIZE_KEY, "我不知道这是什么");

    let scenario = TestScenario::new().with_ai(ai).build();
    let images = vec!["data:image/png;base64,aGVsbG8=".to_string()];
    let input = RecipeInput::from_parts(None, Some(images)).unwrap();

    let recipe = scenario.pipeline.parse(input).await.unwrap();

    let created = recipe.newly_created_ingredients.unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].name, "神秘食材");
    assert_eq!(created[0].category, IngredientCategory::Other);
    assert!(recipe.ingredients[0].matched_ingredient_id.is_some());
    assert_eq!(
        scenario.vocabulary.find_ingredient("神秘食材").unwrap().category,
        IngredientCategory::Other
    );

    // The photo went to the model with the recipe prompt.
    assert_eq!(scenario.ai.calls()[0].image_count, 1);
}

#[tokio::test]
async fn test_missing_page_is_fetch_error() {
    let scenario = TestScenario::new().build();

    let err = scenario
        .pipeline
        .parse_url("https://recipes.example.com/gone")
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractionError::Fetch(FetchError::Status { status: 404, .. })));
    assert!(err.is_fatal_to_pipeline());
    assert_eq!(err.user_message(), "无法获取链接内容");
}

#[tokio::test]
async fn test_unparseable_inference_reply_fails() {
    let url = "https://blog.example.com/essay";
    let scenario = TestScenario::new()
        .with_page(url, "<html><body><main>今天天气很好，我们去公园散步。</main></body></html>")
        .with_ai_response(RECIPE_PROMPT_KEY, "抱歉，这不是菜谱。")
        .build();

    let err = scenario.pipeline.parse_url(url).await.unwrap_err();
    assert!(matches!(err, ExtractionError::UnparseableResponse { .. }));
    assert_eq!(err.user_message(), "无法解析菜谱内容");
}

#[test]
fn test_input_requires_exactly_one_form() {
    let err = RecipeInput::from_parts(None, None).unwrap_err();
    assert_eq!(err.user_message(), "请提供链接或图片");

    let err = RecipeInput::from_parts(
        Some("https://a.com".into()),
        Some(vec!["aGVsbG8=".into()]),
    )
    .unwrap_err();
    assert!(matches!(err, ExtractionError::InvalidInput { .. }));
}
