//! Care-plan generation for one pet.

use crate::error::{Error, Result};
use crate::model::{GenerateRequest, GenerativeModel, Message};
use crate::prompts::{care_plan_prompt, CARE_PLAN_SYSTEM};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use vetcare_core::Pet;

/// Structured plan returned by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarePlan {
    pub summary: String,
    pub recommendations: Vec<String>,
    /// Days until the suggested follow-up visit
    #[serde(default)]
    pub follow_up_days: Option<u32>,
}

pub struct CarePlanner {
    model: Arc<dyn GenerativeModel>,
}

impl CarePlanner {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    pub async fn generate_care_plan(
        &self,
        pet: &Pet,
        concern: &str,
        today: NaiveDate,
    ) -> Result<CarePlan> {
        if concern.trim().is_empty() {
            return Err(Error::InvalidRequest("concern is required".to_string()));
        }

        let request = GenerateRequest {
            system: Some(CARE_PLAN_SYSTEM.to_string()),
            messages: vec![Message::user(care_plan_prompt(pet, concern, today))],
            tools: Vec::new(),
            response_schema: Some(schema()),
            temperature: Some(0.3),
        };
        let response = self.model.generate(&request).await?;
        let mut plan: CarePlan = response.json()?;

        plan.summary = plan.summary.trim().to_string();
        if plan.summary.is_empty() {
            return Err(Error::MalformedOutput("care plan has no summary".to_string()));
        }
        plan.recommendations.retain(|r| !r.trim().is_empty());

        info!(
            pet = %pet.id,
            recommendations = plan.recommendations.len(),
            "care plan generated"
        );
        Ok(plan)
    }
}

fn schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "summary": { "type": "string" },
            "recommendations": { "type": "array", "items": { "type": "string" } },
            "follow_up_days": { "type": "integer" }
        },
        "required": ["summary", "recommendations"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GenerateResponse, ScriptedModel};
    use chrono::Utc;
    use vetcare_core::{PetDraft, Species};

    fn pet() -> Pet {
        PetDraft {
            name: "Rex".to_string(),
            species: Species::Dog,
            breed: Some("Beagle".to_string()),
            sex: Default::default(),
            birth_date: NaiveDate::from_ymd_opt(2019, 5, 20),
            weight_kg: Some(12.5),
            allergies: Vec::new(),
            notes: None,
        }
        .into_pet("p1".to_string(), "t1".to_string(), Utc::now())
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[tokio::test]
    async fn test_parses_plan() {
        let model = Arc::new(ScriptedModel::new([GenerateResponse::text(
            r#"```json
{"summary": " Weight control for a senior beagle. ", "recommendations": ["Measure meals", ""], "follow_up_days": 30}
```"#,
        )]));
        let planner = CarePlanner::new(model.clone());

        let plan = planner
            .generate_care_plan(&pet(), "gaining weight", today())
            .await
            .unwrap();
        assert_eq!(plan.summary, "Weight control for a senior beagle.");
        assert_eq!(plan.recommendations, vec!["Measure meals".to_string()]);
        assert_eq!(plan.follow_up_days, Some(30));

        let requests = model.requests();
        assert!(requests[0].response_schema.is_some());
        assert!(requests[0].tools.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_output() {
        let model = Arc::new(ScriptedModel::new([
            GenerateResponse::text("Feed less and walk more."),
            GenerateResponse::text(r#"{"summary": "  ", "recommendations": []}"#),
        ]));
        let planner = CarePlanner::new(model);

        for _ in 0..2 {
            let result = planner.generate_care_plan(&pet(), "weight", today()).await;
            assert!(matches!(result, Err(Error::MalformedOutput(_))));
        }
    }

    #[tokio::test]
    async fn test_concern_required() {
        let model = Arc::new(ScriptedModel::default());
        let planner = CarePlanner::new(model.clone());
        let result = planner.generate_care_plan(&pet(), "   ", today()).await;
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
        assert!(model.requests().is_empty());
    }
}
