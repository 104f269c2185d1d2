//! 签名人解析

use phf::phf_map;

use crate::config::Config;

/// 操作系统用户名（小写）→ 签名人姓名
static SIGNERS_BY_OPERATOR: phf::Map<&'static str, &'static str> = phf_map! {
    "albert.junior" => "ALBERT IGLÉSIA CORREA DOS SANTOS JUNIOR",
    "larissa.janiques" => "LARISSA JANIQUES PINTO",
    "carla.meirelles" => "CARLA ZAMBI MEIRELLES",
    "gabriela.novaes" => "GABRIELA LOPES SALGADO NOVAES",
};

/// 按操作员查签名人
pub fn signer_for_operator(operator: &str) -> Option<&'static str> {
    SIGNERS_BY_OPERATOR
        .get(operator.trim().to_lowercase().as_str())
        .copied()
}

/// 签名人：配置覆盖 → 操作员查表 → 负责人姓名大写
pub fn resolve_signer(config: &Config) -> String {
    if let Some(name) = config.signer_name.as_deref().map(str::trim) {
        if !name.is_empty() {
            return name.to_string();
        }
    }
    signer_for_operator(&config.operator)
        .map(str::to_string)
        .unwrap_or_else(|| config.responsible_name.trim().to_uppercase())
}
