//! LLM prompts for the recipe pipeline.
//!
//! Every prompt embeds the current vocabulary so the model reuses existing
//! ingredient and unit names instead of inventing near-duplicates.

use crate::types::vocabulary::{IngredientCategory, Unit, VocabularySnapshot};

/// System prompt for full-recipe parsing (web text or photos).
pub const RECIPE_SYSTEM_PROMPT: &str = r#"你是一个专业的菜谱解析助手。请从提供的{source}中提取菜谱的名称、食材和步骤。

输出格式要求（JSON）：
{
  "name": "菜谱名称",
  "ingredients": [
    {"name": "食材中文名称", "count": 数量（数字，"适量"时为null）, "unit": "单位英文名称"}
  ],
  "steps": [
    {"text": "步骤1"},
    {"text": "步骤2"}
  ]
}

可用的单位（优先使用这些）: {units}

已有的食材（尽量匹配这些）: {ingredients}

规则：
1. 食材名称必须是中文
2. 数量必须是数字，原文为"适量"、"少许"等时设为null
3. 单位必须是英文，从可用单位中选择最接近的
4. 找不到合适的单位时使用 "piece"
5. 每一步是一个独立、完整的操作
6. 只输出JSON，不要其他内容"#;

/// User prompt wrapping reduced page text.
pub const RECIPE_TEXT_PROMPT: &str = "请从以下网页内容中提取菜谱信息：\n\n{content}";

/// User prompt accompanying recipe photos.
pub const RECIPE_IMAGE_PROMPT: &str = "请从这些图片中提取菜谱信息（名称、食材和步骤）";

/// Prompt for splitting raw ingredient lines into name/count/unit.
pub const INGREDIENT_LINES_PROMPT: &str = r#"请从以下食材列表中提取食材名称、数量和单位。

食材列表:
{lines}

可用的单位: {units}

输出JSON格式:
{
  "ingredients": [
    {"name": "食材名称", "count": 数量或null, "unit": "单位英文名或null"}
  ]
}

规则:
1. 食材名称必须是中文
2. 数量为数字，"适量"/"少许"等为null
3. 单位用英文，从可用单位选择
4. 按原顺序输出，每行对应一个食材
5. 只输出JSON"#;

/// Prompt for assigning categories to unknown ingredients.
pub const CATEGORIZE_PROMPT: &str = r#"请为以下食材分配合适的分类。

食材列表:
{ingredients}

可用的分类: {categories}

输出JSON格式:
{
  "ingredients": [
    {"name": "食材名称", "category": "分类"}
  ]
}

规则:
1. 每个食材必须分配到最合适的一个分类
2. 分类必须从可用分类中选择
3. 不确定时使用"其他"
4. 只输出JSON"#;

/// "g (克), tbsp (大勺), ..."
pub fn format_unit_list(units: &[Unit]) -> String {
    units
        .iter()
        .map(|u| format!("{} ({})", u.name, u.display_name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format the recipe system prompt. `source` is "网页内容" or "图片".
pub fn format_recipe_system_prompt(source: &str, vocabulary: &VocabularySnapshot) -> String {
    let ingredients = vocabulary
        .ingredients
        .iter()
        .map(|i| i.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    RECIPE_SYSTEM_PROMPT
        .replace("{source}", source)
        .replace("{units}", &format_unit_list(&vocabulary.units))
        .replace("{ingredients}", &ingredients)
}

pub fn format_recipe_text_prompt(content: &str) -> String {
    RECIPE_TEXT_PROMPT.replace("{content}", content)
}

pub fn format_ingredient_lines_prompt(lines: &[String], units: &[Unit]) -> String {
    INGREDIENT_LINES_PROMPT
        .replace("{lines}", &numbered(lines))
        .replace("{units}", &format_unit_list(units))
}

pub fn format_categorize_prompt(names: &[String]) -> String {
    CATEGORIZE_PROMPT
        .replace("{ingredients}", &numbered(names))
        .replace("{categories}", &IngredientCategory::label_list())
}
