use crate::models::{Language, Role, SolarStats, Turn};
use crate::panels::PanelRecord;

const INVENTORY_PLACEHOLDER: &str = "Đang cập nhật";

/// Assembles the text sent to the generation service.
///
/// The persona, including the panel inventory summary, is resolved once at
/// construction and reused for every turn.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_prompt: String,
}

impl PromptBuilder {
    pub fn new(panels: &[PanelRecord]) -> Self {
        let panel_list = if panels.is_empty() {
            INVENTORY_PLACEHOLDER.to_string()
        } else {
            panels
                .iter()
                .map(PanelRecord::summary)
                .collect::<Vec<_>>()
                .join(", ")
        };

        let system_prompt = format!(
            "Bạn là chuyên gia tư vấn lắp đặt và bảo trì hệ thống điện mặt trời. \
             Hỗ trợ 2 loại khách hàng: (1) Hộ gia đình - tư vấn lắp đặt tiết kiệm điện, \
             (2) Nhà máy điện - tư vấn bảo trì, tối ưu hệ thống quy mô lớn. \
             Khi người dùng đề cập 'hộ gia đình' hoặc 'nhà máy', điều chỉnh tư vấn cho phù hợp. \
             Trả lời bằng văn bản thuần, KHÔNG dùng markdown, bullet points (* - #), KHÔNG in đậm (**text**). \
             Giữ ngôn ngữ theo người dùng (vi/en), ngắn gọn (≤100 từ). \
             Các tấm pin khả dụng: {panel_list}. \
             Nếu thiếu thông số (kWp, vị trí, module, tilt, azimuth, performance ratio), hỏi tối đa 1 câu."
        );

        Self { system_prompt }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn build(&self, history: &[Turn], language: Language, stats: Option<&SolarStats>) -> String {
        let (language_name, guidance) = match language {
            Language::Vi => (
                "Tiếng Việt",
                "Nếu thiếu dữ liệu (kWp, vị trí, module, tilt, azimuth, performance ratio), \
                 hãy hỏi tối đa 1 câu bổ sung mỗi lượt. Trả lời ngắn gọn (≤80 từ).",
            ),
            Language::En => (
                "English",
                "If key data is missing (kWp, location, module, tilt, azimuth, performance ratio), \
                 ask at most 1 follow-up per turn. Keep replies concise (≤80 words).",
            ),
        };

        let transcript = history
            .iter()
            .map(|turn| format!("{}: {}", speaker(turn.role, language), turn.content))
            .collect::<Vec<_>>()
            .join("\n");

        let mut prompt = format!(
            "System: {}\nNgôn ngữ: {}\nHướng dẫn: {}\nLịch sử:\n{}",
            self.system_prompt, language_name, guidance, transcript
        );

        if let Some(stats) = stats {
            let heading = match language {
                Language::Vi => "Thông tin sản lượng gần nhất:",
                Language::En => "Latest production estimates:",
            };
            prompt.push('\n');
            prompt.push_str(heading);
            prompt.push('\n');
            prompt.push_str(&format_stats_summary(stats, language));
        }

        prompt
    }
}

fn speaker(role: Role, language: Language) -> &'static str {
    match (role, language) {
        (Role::User, Language::Vi) => "Người dùng",
        (Role::Assistant, Language::Vi) => "Trợ lý",
        (Role::User, Language::En) => "User",
        (Role::Assistant, Language::En) => "Assistant",
    }
}

/// Four-line localized summary of the cached estimator output
pub fn format_stats_summary(stats: &SolarStats, language: Language) -> String {
    let efficiency = stats
        .module_efficiency
        .map(|e| e.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    match language {
        Language::Vi => format!(
            "- Năng lượng/ngày (tb): {:.2} kWh\n\
             - Năng lượng/năm (ước tính): {:.0} kWh\n\
             - GII/ngày (tb): {:.2} kWh/m²\n\
             - Module: {} hiệu suất",
            stats.average_daily_energy,
            stats.yearly_total_energy,
            stats.average_daily_gii,
            efficiency
        ),
        Language::En => format!(
            "- Daily energy (avg): {:.2} kWh\n\
             - Yearly energy (est): {:.0} kWh\n\
             - Daily GII (avg): {:.2} kWh/m²\n\
             - Module eff: {}",
            stats.average_daily_energy,
            stats.yearly_total_energy,
            stats.average_daily_gii,
            efficiency
        ),
    }
}
