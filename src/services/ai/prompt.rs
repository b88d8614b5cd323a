use crate::models::{AcademySettings, Catalog, SchedulingPolicy};

const BASE_PROMPT: &str = "Você é o assistente virtual de uma academia de ginástica. \
Responda em português do Brasil, de forma simpática e objetiva, em no máximo três frases. \
Use apenas as informações abaixo; se não souber algo, sugira falar com a equipe.";

/// System prompt for the free-form fallback chat.
pub fn build_system_prompt(settings: &AcademySettings, catalog: &Catalog) -> String {
    let mut lines = vec![BASE_PROMPT.to_string()];

    lines.push(format!("Nome da academia: {}.", settings.academy_name));
    if !settings.whatsapp_number.is_empty() {
        lines.push(format!(
            "Contato humano pelo WhatsApp: {}.",
            settings.whatsapp_number
        ));
    }
    if let Some(hours) = settings.opening_hours.as_ref().filter(|h| !h.slots.is_empty()) {
        lines.push(format!("Horário de funcionamento: {}.", hours.to_human_readable()));
    }

    match settings.allow_scheduling {
        SchedulingPolicy::Off => lines.push(
            "Você NÃO agenda aulas. Para agendamentos, oriente a pessoa a chamar a equipe no WhatsApp."
                .to_string(),
        ),
        SchedulingPolicy::OnIntent | SchedulingPolicy::Always => lines.push(
            "Se a pessoa quiser agendar uma aula experimental, peça nome, dia e horário.".to_string(),
        ),
    }

    if !catalog.plans.is_empty() {
        lines.push("\nPlanos:".to_string());
        for plan in &catalog.plans {
            if plan.description.is_empty() {
                lines.push(format!("- {}: {}", plan.name, plan.price));
            } else {
                lines.push(format!("- {}: {} ({})", plan.name, plan.price, plan.description));
            }
        }
    }

    if !catalog.promotions.is_empty() {
        lines.push("\nPromoções vigentes:".to_string());
        for promo in &catalog.promotions {
            let until = promo
                .valid_until
                .as_deref()
                .map(|d| format!(" (até {d})"))
                .unwrap_or_default();
            lines.push(format!("- {}{until}: {}", promo.title, promo.description));
        }
    }

    if !catalog.partners.is_empty() {
        lines.push("\nParceiros:".to_string());
        for partner in &catalog.partners {
            lines.push(format!("- {}: {}", partner.name, partner.benefit));
        }
    }

    if !catalog.knowledge.is_empty() {
        lines.push("\nInformações gerais:".to_string());
        for entry in &catalog.knowledge {
            lines.push(format!("## {}\n{}", entry.title, entry.content));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KnowledgeEntry, Plan, Promotion};

    #[test]
    fn test_minimal_prompt() {
        let prompt = build_system_prompt(&AcademySettings::default(), &Catalog::default());
        assert!(prompt.contains("Nome da academia: Academia."));
        assert!(!prompt.contains("WhatsApp:"));
        assert!(!prompt.contains("Planos:"));
    }

    #[test]
    fn test_prompt_folds_catalog() {
        let settings = AcademySettings {
            academy_name: "Iron Gym".to_string(),
            whatsapp_number: "5511988887777".to_string(),
            allow_scheduling: SchedulingPolicy::Off,
            ..AcademySettings::default()
        };
        let catalog = Catalog {
            knowledge: vec![KnowledgeEntry {
                id: 1,
                title: "Estacionamento".into(),
                content: "Gratuito para alunos.".into(),
            }],
            plans: vec![Plan {
                id: 1,
                name: "Mensal".into(),
                price: "R$ 99,90".into(),
                description: String::new(),
            }],
            promotions: vec![Promotion {
                id: 1,
                title: "Matrícula grátis".into(),
                description: "Só em junho".into(),
                valid_until: Some("2025-06-30".into()),
            }],
            partners: vec![],
        };

        let prompt = build_system_prompt(&settings, &catalog);
        assert!(prompt.contains("Iron Gym"));
        assert!(prompt.contains("5511988887777"));
        assert!(prompt.contains("NÃO agenda"));
        assert!(prompt.contains("- Mensal: R$ 99,90"));
        assert!(prompt.contains("Matrícula grátis (até 2025-06-30)"));
        assert!(prompt.contains("Gratuito para alunos."));
        assert!(!prompt.contains("Parceiros:"));
    }
}
