//! Bradesco CNAB400 remittance layout
//!
//! Positions follow the published table, including its known overlap:
//! `tipo_inscricao_pagador` (220), `cpf_cnpj_pagador` (221-234) and the head
//! of `nome_pagador` (235-274) sit inside `valor_iof` (214-226) and
//! `valor_abatimento` (227-239). The overlap is kept as published; a
//! corrected table only needs a different [`Layout`].

use super::{Layout, DETAIL, HEADER, TRAILER};
use crate::field::{CrossFieldRule, FieldSpec, Transform};
use crate::rules::RecordRule;
use crate::Result;
use once_cell::sync::Lazy;

/// Built-in layout instance
pub static BRADESCO_CNAB400: Lazy<Layout> =
    Lazy::new(|| build_bradesco_cnab400().expect("built-in Bradesco CNAB400 layout"));

const DATE: &str = r"\d{6}";
const AMOUNT_13_2: &str = r"\d{13}";

fn sequencial_registro() -> Result<FieldSpec> {
    Ok(FieldSpec::new("sequencial_registro", 395, 400, "Sequencial do Registro")
        .pattern(r"\d{6}")?
        .transform(Transform::Integer))
}

fn header() -> Result<Vec<FieldSpec>> {
    Ok(vec![
        FieldSpec::new("identificacao_registro", 1, 1, "Identificação do Registro").allowed(&["0"]),
        FieldSpec::new("tipo_operacao", 2, 2, "Tipo de Operação").allowed(&["1"]),
        FieldSpec::new("literal_remessa", 3, 9, "Literal REMESSA").allowed(&["REMESSA"]),
        FieldSpec::new("codigo_servico", 10, 11, "Código do Serviço").pattern(r"\d{2}")?,
        FieldSpec::new("literal_servico", 12, 26, "Literal do Serviço (COBRANCA)"),
        FieldSpec::new("codigo_empresa", 27, 46, "Código Empresa"),
        FieldSpec::new("nome_empresa", 47, 76, "Nome da Empresa"),
        // 237 Bradesco, 463 partner bank on the same layout
        FieldSpec::new("codigo_banco", 77, 79, "Código Banco").allowed(&["237", "463"]),
        FieldSpec::new("nome_banco", 80, 94, "Nome Banco"),
        FieldSpec::new("data_gravacao", 95, 100, "Data Gravação (DDMMAA)")
            .pattern(DATE)?
            .transform(Transform::Date),
        FieldSpec::new("filler_1", 101, 108, "Brancos").optional(),
        FieldSpec::new("filler_2", 109, 110, "Brancos").optional(),
        FieldSpec::new("sequencial_remessa", 111, 117, "Número Sequencial Remessa")
            .pattern(r"\d{7}")?
            .transform(Transform::Integer),
        FieldSpec::new("filler_3", 118, 394, "Brancos").optional(),
        sequencial_registro()?,
    ])
}

fn detail() -> Result<Vec<FieldSpec>> {
    Ok(vec![
        FieldSpec::new("identificacao_registro", 1, 1, "Identificação").allowed(&["1"]),
        FieldSpec::new("ident_debito_automatico", 2, 20, "Ident. Débito Automático").optional(),
        FieldSpec::new("ident_empresa_banco", 21, 37, "Identificação Empresa"),
        FieldSpec::new("controle_participante", 38, 62, "Controle Participante").optional(),
        FieldSpec::new("codigo_banco_debito", 63, 65, "Código Banco Débito")
            .optional()
            .pattern(r"\d{3}")?,
        FieldSpec::new("indicador_multa", 66, 66, "Indicador Multa")
            .optional()
            .allowed(&["0", "2", " "]),
        FieldSpec::new("percentual_multa", 67, 70, "Percentual Multa (4,2)")
            .optional()
            .pattern(r"\d{4}")?
            .transform(Transform::Percent)
            .rule(CrossFieldRule::SurchargeConsistency),
        FieldSpec::new("nosso_numero", 71, 82, "Nosso Número").pattern(r"\d{12}")?,
        FieldSpec::new("data_segundo_desconto", 83, 88, "Data 2º Desconto")
            .optional()
            .pattern(DATE)?
            .transform(Transform::OptionalDate),
        FieldSpec::new("filler_a", 89, 92, "Brancos").optional(),
        FieldSpec::new("cond_emissao_boleto", 93, 93, "Condição Emissão").optional(),
        FieldSpec::new("cond_registro_debito", 94, 94, "Condição Débito Automático").optional(),
        FieldSpec::new("filler_b", 95, 104, "Brancos").optional(),
        FieldSpec::new("indicador_rateio", 105, 105, "Indicador Rateio").optional(),
        FieldSpec::new("end_aviso_debito", 106, 106, "Endereço Aviso Débito").optional(),
        FieldSpec::new("pagamento_parcial", 107, 108, "Pagamento Parcial").optional(),
        FieldSpec::new("ocorrencia", 109, 110, "Ocorrência").optional(),
        FieldSpec::new("filler_c", 111, 120, "Brancos").optional(),
        FieldSpec::new("data_vencimento", 121, 126, "Data Vencimento")
            .pattern(DATE)?
            .transform(Transform::Date),
        FieldSpec::new("valor_titulo", 127, 139, "Valor Título (13,2)")
            .pattern(AMOUNT_13_2)?
            .transform(Transform::Amount),
        FieldSpec::new("codigo_banco_cobrador", 140, 142, "Banco Cobrador")
            .optional()
            .pattern(r"\d{3}")?,
        FieldSpec::new("agencia_cobradora", 143, 147, "Agência Cobradora").pattern(r"\d{5}")?,
        FieldSpec::new("especie", 148, 149, "Espécie").pattern(r"\d{2}")?,
        FieldSpec::new("aceite", 150, 150, "Aceite")
            .optional()
            .allowed(&["A", "N", " "]),
        FieldSpec::new("data_emissao", 151, 156, "Data Emissão")
            .pattern(DATE)?
            .transform(Transform::Date),
        FieldSpec::new("instrucao1", 157, 160, "Instrução 1")
            .optional()
            .pattern(r"\d{4}")?,
        FieldSpec::new("instrucao2", 161, 164, "Instrução 2")
            .optional()
            .pattern(r"\d{4}")?,
        FieldSpec::new("juros_dia", 165, 177, "Juros por Dia (13,2)")
            .optional()
            .pattern(AMOUNT_13_2)?
            .transform(Transform::Amount),
        FieldSpec::new("data_desconto", 178, 183, "Data 1º Desconto")
            .optional()
            .pattern(DATE)?
            .transform(Transform::OptionalDate),
        FieldSpec::new("valor_desconto", 184, 196, "Valor Desconto (13,2)")
            .optional()
            .pattern(AMOUNT_13_2)?
            .transform(Transform::Amount),
        FieldSpec::new("filler_d", 197, 213, "Brancos").optional(),
        FieldSpec::new("valor_iof", 214, 226, "Valor IOF (13,2)")
            .optional()
            .pattern(AMOUNT_13_2)?
            .transform(Transform::Amount),
        FieldSpec::new("valor_abatimento", 227, 239, "Valor Abatimento (13,2)")
            .optional()
            .transform(Transform::LenientAmount),
        // Published position, inside valor_iof
        FieldSpec::new("tipo_inscricao_pagador", 220, 220, "Tipo Inscrição Pagador").optional(),
        FieldSpec::new("cpf_cnpj_pagador", 221, 234, "CPF/CNPJ Pagador").pattern(r"\d{14}")?,
        FieldSpec::new("nome_pagador", 235, 274, "Nome Pagador"),
        FieldSpec::new("endereco_pagador", 275, 314, "Endereço Pagador"),
        FieldSpec::new("cep_pagador", 315, 322, "CEP Pagador")
            .optional()
            .pattern(r"\d{8}")?,
        FieldSpec::new("sacador_avalista", 323, 362, "Sacador / Avalista").optional(),
        FieldSpec::new("filler_e", 363, 394, "Brancos").optional(),
        sequencial_registro()?,
    ])
}

fn free_text(record_type: &str, name: &str, description: &str) -> Result<Vec<FieldSpec>> {
    Ok(vec![
        FieldSpec::new("identificacao_registro", 1, 1, "Identificação").allowed(&[record_type]),
        FieldSpec::new(name, 2, 394, description).optional(),
        sequencial_registro()?,
    ])
}

fn trailer() -> Result<Vec<FieldSpec>> {
    let total = |name: &str, start: usize, end: usize, description: &str| {
        FieldSpec::new(name, start, end, description)
            .optional()
            .pattern(AMOUNT_13_2)
            .map(|f| f.transform(Transform::Amount))
    };
    Ok(vec![
        FieldSpec::new("identificacao_registro", 1, 1, "Identificação").allowed(&["9"]),
        FieldSpec::new("total_registros", 2, 7, "Total Registros")
            .optional()
            .pattern(r"\d{6}")?
            .transform(Transform::IntegerOrZero),
        FieldSpec::new("total_titulos_cobranca", 8, 13, "Qtd Títulos")
            .optional()
            .pattern(r"\d{6}")?
            .transform(Transform::IntegerOrZero),
        total("valor_total_titulos", 14, 26, "Valor Total Títulos")?,
        total("valor_total_abatimentos", 27, 39, "Total Abatimentos")?,
        total("valor_total_descontos", 40, 52, "Total Descontos")?,
        total("valor_total_juros", 53, 65, "Total Juros/Mora")?,
        total("valor_total_iof", 66, 78, "Total IOF")?,
        total("valor_total_outros", 79, 91, "Total Outros")?,
        FieldSpec::new("filler_trailer", 92, 394, "Brancos").optional(),
        sequencial_registro()?,
    ])
}

/// Build the Bradesco CNAB400 layout
pub fn build_bradesco_cnab400() -> Result<Layout> {
    Layout::builder("bradesco-cnab400")
        .record(HEADER, header()?)
        .record(DETAIL, detail()?)
        .record('2', free_text("2", "mensagem", "Mensagem / Instruções")?)
        .record('3', free_text("3", "conteudo", "Conteúdo Registro 3")?)
        .record('6', free_text("6", "conteudo", "Conteúdo Registro 6")?)
        .record('7', free_text("7", "endereco_complementar", "Endereço Complementar")?)
        .record(TRAILER, trailer()?)
        .rule(DETAIL, RecordRule::DateOrdering)
        .rule(DETAIL, RecordRule::CheckDigit)
        .rule('2', RecordRule::IncompletePhone)
        .sequence_field(395, 400)
        .bank_code_field(77, 79)
        .build()
}
