//! 转办说明（observação）内容
//!
//! 固定模板 + 签名人姓名，构造后不可变。

use regex::Regex;

use crate::error::AppResult;

const TEMPLATE_PARAGRAPHS: [&str; 4] = [
    "Ao Gabinete do Presidente Executivo,",
    "Encaminha-se, para assinatura, o ato constante da minuta anexa ao processo.",
    "Registre-se que a análise desta Unidade de Controle Interno quanto às concessões de \
     aposentadoria, reserva remunerada, reforma e pensão, nos termos do Anexo VII da Instrução \
     Normativa TCE nº 68, de 8 de dezembro de 2020, ainda depende de regulamentação específica, \
     razão pela qual não houve emissão de parecer técnico sobre o presente ato.",
    "Respeitosamente,",
];

/// 转办说明
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationPayload {
    html: String,
    plain: String,
}

impl ObservationPayload {
    /// 按签名人生成说明（签名居中加粗）
    pub fn for_signer(signer: &str) -> AppResult<Self> {
        let mut html: String = TEMPLATE_PARAGRAPHS
            .iter()
            .map(|p| format!("<p>{}</p>", p))
            .collect();
        html.push_str(&format!(
            "<div style='text-align:center; margin-top:12px;'><b>{}</b></div>",
            signer.trim()
        ));
        Self::from_html(html)
    }

    /// 由任意 HTML 构造
    pub fn from_html(html: impl Into<String>) -> AppResult<Self> {
        let html = html.into();
        let plain = html_to_plain(&html)?;
        Ok(Self { html, plain })
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// 纯文本形式，写入隐藏字段 / 文本框
    pub fn plain_text(&self) -> &str {
        &self.plain
    }

    /// 编辑器使用的 HTML（换行转 `<br>`）
    pub fn editor_html(&self) -> String {
        self.html.replace('\n', "<br>")
    }

    /// 期望长度：HTML 的字符数
    pub fn expected_len(&self) -> usize {
        self.html.chars().count()
    }
}

/// HTML 转纯文本：块结束和 `<br>` 变为换行，去掉标签，解码常见实体
pub fn html_to_plain(html: &str) -> AppResult<String> {
    let breaks = Regex::new(r"(?i)<br\s*/?>|</p\s*>|</div\s*>")?;
    let tags = Regex::new(r"<[^>]+>")?;

    let with_breaks = breaks.replace_all(html, "\n");
    let stripped = tags.replace_all(&with_breaks, "");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    let lines: Vec<&str> = decoded
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_block_is_centered_and_bold() {
        let payload = ObservationPayload::for_signer("LARISSA JANIQUES PINTO").unwrap();
        assert!(payload.html().starts_with("<p>Ao Gabinete do Presidente Executivo,</p>"));
        assert!(payload.html().ends_with(
            "<div style='text-align:center; margin-top:12px;'><b>LARISSA JANIQUES PINTO</b></div>"
        ));
    }

    #[test]
    fn test_plain_text_rendering() {
        let payload = ObservationPayload::for_signer("FULANA").unwrap();
        let lines: Vec<&str> = payload.plain_text().lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Ao Gabinete do Presidente Executivo,");
        assert_eq!(lines[4], "FULANA");
        assert!(!payload.plain_text().contains('<'));
    }

    #[test]
    fn test_entities_and_breaks() {
        let plain = html_to_plain("a&nbsp;&amp;&nbsp;b<br/>c<BR>d &lt;e&gt;").unwrap();
        assert_eq!(plain, "a & b\nc\nd <e>");
    }

    #[test]
    fn test_expected_len_counts_chars() {
        let payload = ObservationPayload::from_html("<p>ação</p>").unwrap();
        assert_eq!(payload.expected_len(), 11);
        assert_eq!(payload.editor_html(), "<p>ação</p>");
    }
}
