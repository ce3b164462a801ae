//! # Taxonomia de Erros
//!
//! Erros estruturais (seletor inválido, arquivo obrigatório ausente, padrão
//! regex inválido) são propagados imediatamente ao chamador.
//!
//! Casos de esparsidade dos dados (vocabulário vazio, empates, documentos sem
//! nenhum token reconhecido) **nunca** viram erro: cada componente define um
//! valor de fallback documentado.

use std::path::PathBuf;

/// Erros do pipeline de anotação.
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    /// Seleção de colunas mistura nomes e índices, está vazia ou não encontra a coluna.
    #[error("seleção de colunas inválida: {0}")]
    InvalidSelector(String),

    /// Operação que exige um modelo TF-IDF treinado foi chamada antes do `fit`.
    #[error("o extrator TF-IDF ainda não foi treinado (chame `fit` primeiro)")]
    NotFitted,

    /// Tabela/arquivo persistido não existe e não há caminho alternativo.
    #[error("arquivo não encontrado: {}", .0.display())]
    MissingFile(PathBuf),

    /// O padrão de tokenização configurado não compila.
    #[error("padrão regex inválido: {0}")]
    Pattern(#[from] regex::Error),

    #[error("erro de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error("erro de CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("erro de JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Atalho para resultados do crate.
pub type Result<T> = std::result::Result<T, TagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TagError::InvalidSelector("lista mista".into());
        assert!(err.to_string().contains("lista mista"));

        let err = TagError::MissingFile(PathBuf::from("/tmp/vocab.csv"));
        assert!(err.to_string().contains("vocab.csv"));
    }

    #[test]
    fn test_regex_error_converts() {
        fn compile() -> Result<regex::Regex> {
            Ok(regex::Regex::new("(")?)
        }
        assert!(matches!(compile(), Err(TagError::Pattern(_))));
    }
}
