mod common;

use common::{
    add_headers, inside_items, item_control_id, item_form, receive_list, test_config,
    unit_selection_page, Element, FakeSession,
};
use tokio::sync::mpsc::Receiver;
use ueci_tramitacao::error::AppError;
use ueci_tramitacao::models::selectors;
use ueci_tramitacao::models::{BlockRule, ObservationPayload};
use ueci_tramitacao::orchestrator::{receive_items, App, BatchState};
use ueci_tramitacao::services::{StatusEvent, StatusReporter};
use ueci_tramitacao::workflow::{ItemCtx, ItemFlow};

fn drain(rx: &mut Receiver<StatusEvent>) -> (Vec<String>, Vec<f64>) {
    let mut texts = Vec::new();
    let mut progress = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event {
            StatusEvent::Status(text) => texts.push(text),
            StatusEvent::Progress(p) => progress.push(p),
        }
    }
    (texts, progress)
}

/// 已在部门内的工作队列
fn inside_unit_queue(session: &FakeSession) {
    session.with(add_headers);
}

#[tokio::test(start_paused = true)]
async fn test_inside_unit_with_items_processes_every_item() {
    let config = test_config();
    let session = FakeSession::new();
    inside_unit_queue(&session);
    inside_items(&session, 3);
    item_form(&session, &config);

    let (reporter, mut rx) = StatusReporter::channel(512);
    let mut app = App::with_session(config.clone(), Box::new(session.clone()), reporter);
    let report = app.run().await.unwrap();

    assert_eq!(app.state(), BatchState::Idle);
    assert_eq!(report.queue.total, 3);
    assert_eq!(report.queue.processed, 3);
    assert_eq!(report.queue.failed, 0);
    assert!(!report.nothing_to_process);
    assert!(report.intake.received.is_empty());

    // 内控 → 转办面板 → 说明
    assert_eq!(
        session.value_of(selectors::RESPONSIBLE_CPF_ID).as_deref(),
        Some(config.responsible_cpf.as_str())
    );
    assert_eq!(
        session.value_of(selectors::DESPATCH_TYPE_ID).as_deref(),
        Some(config.despatch_type_value.as_str())
    );
    assert_eq!(
        session.value_of(selectors::DESTINATION_UNIT_ID).as_deref(),
        Some(config.destination_unit_value.as_str())
    );
    let payload = ObservationPayload::for_signer("MARIA SOUZA").unwrap();
    assert_eq!(
        session.value_of(selectors::OBSERVATION_ID).as_deref(),
        Some(payload.plain_text())
    );

    assert_eq!(session.count_log("accept:Processo tramitado"), 3);
    // 每次提交恰好关闭一个报表窗口
    assert_eq!(session.closed_windows(), vec!["W1", "W2", "W3"]);
    assert_eq!(session.with(|s| s.windows.len()), 1);
    assert_eq!(session.count_log("click:ctl00_ContentToolBar_btnSalvar"), 3);
    assert!(session.released());

    let (texts, progress) = drain(&mut rx);
    assert!(texts.iter().any(|t| t.contains("成功 3 个")));
    assert_eq!(progress.last().copied(), Some(1.0));
}

#[tokio::test(start_paused = true)]
async fn test_unit_selection_then_intake_then_items() {
    let config = test_config();
    let session = FakeSession::new();
    unit_selection_page(&session, &config);
    receive_list(
        &session,
        &["CPAD", "GERÊNCIA DE BENEFÍCIOS", "Coordenação Protocolo e Arquivo Documental"],
    );
    inside_items(&session, 2);
    item_form(&session, &config);

    let (reporter, _rx) = StatusReporter::channel(512);
    let mut app = App::with_session(config, Box::new(session.clone()), reporter);
    let report = app.run().await.unwrap();

    assert_eq!(app.state(), BatchState::Idle);
    assert_eq!(report.intake.found, 3);
    assert_eq!(report.intake.received.len(), 1);
    assert_eq!(report.intake.received[0].origin, "GERÊNCIA DE BENEFÍCIOS");
    assert_eq!(report.intake.skipped.len(), 2);
    assert!(report.intake.acknowledgement.is_some());
    assert_eq!(report.queue.processed, 2);

    assert_eq!(session.count_log("select:ctl00_ContentCampos_ddlSetor=59"), 1);
    assert_eq!(session.count_log("click:ctl00_grdReceber_ctl03_chk_receber"), 1);
    assert_eq!(session.count_log("click:ctl00_grdReceber_ctl02_chk_receber"), 0);
    assert_eq!(session.count_log("click:ctl00_grdReceber_ctl04_chk_receber"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unit_never_confirmed_is_fatal() {
    let config = test_config();
    let session = FakeSession::new();
    session.with(|s| {
        s.add(Element::select(selectors::UNIT_SELECTOR_ID, &[("1", "GERÊNCIA")]));
        s.add(Element::input("submit", selectors::UNIT_CONFIRM_ID));
    });
    inside_items(&session, 1);

    let (reporter, mut rx) = StatusReporter::channel(512);
    let mut app = App::with_session(config, Box::new(session.clone()), reporter);
    let err = app.run().await.unwrap_err();

    assert!(matches!(err, AppError::Navigation(_)));
    assert_eq!(app.state(), BatchState::Fatal);
    assert!(session.released());
    assert_eq!(session.count_log("click:ctl00_ContentCampos_AccordionPane2"), 0);

    let (texts, progress) = drain(&mut rx);
    assert!(texts.last().is_some_and(|t| t.starts_with("❌")));
    assert_eq!(progress.last().copied(), Some(0.0));
}

#[tokio::test(start_paused = true)]
async fn test_empty_queues_end_idle_with_nothing_to_process() {
    let config = test_config();
    let session = FakeSession::new();
    inside_unit_queue(&session);

    let (reporter, mut rx) = StatusReporter::channel(512);
    let mut app = App::with_session(config, Box::new(session.clone()), reporter);
    let report = app.run().await.unwrap();

    assert_eq!(app.state(), BatchState::Idle);
    assert!(report.nothing_to_process);
    assert_eq!(report.queue.attempted(), 0);
    assert!(session.released());

    let (texts, _) = drain(&mut rx);
    assert!(texts.iter().any(|t| t.contains("没有需要转办的条目")));
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_queue_is_fatal() {
    let mut config = test_config();
    config.timings.reauth_wait_ms = 1_000;
    let session = FakeSession::new();
    let login_url = format!("{}/Login/Login.aspx", config.base_url);
    session.on_goto(&config.base_url, move |s| s.set_url(&login_url));

    let (reporter, _rx) = StatusReporter::channel(512);
    let mut app = App::with_session(config, Box::new(session.clone()), reporter);
    let err = app.run().await.unwrap_err();

    assert!(matches!(err, AppError::Navigation(_)));
    assert_eq!(app.state(), BatchState::Fatal);
    assert!(session.released());
}

#[tokio::test(start_paused = true)]
async fn test_failed_item_stays_in_list_and_next_one_is_processed() {
    let config = test_config();
    let session = FakeSession::new();
    inside_unit_queue(&session);
    inside_items(&session, 3);
    item_form(&session, &config);

    // 第一个条目打开后没有内控标签页
    let first = item_control_id(0);
    session.on_click(&item_control_id(0), move |s| {
        s.opened = Some(first.clone());
        s.remove(selectors::INFO_TAB_ID);
    });
    let second = item_control_id(1);
    session.on_click(&item_control_id(1), move |s| {
        s.opened = Some(second.clone());
        s.add(Element::new("span", selectors::INFO_TAB_ID).text(selectors::INFO_TAB_LABEL));
    });

    let (reporter, _rx) = StatusReporter::channel(512);
    let mut app = App::with_session(config.clone(), Box::new(session.clone()), reporter);
    let report = app.run().await.unwrap();

    assert_eq!(report.queue.total, 3);
    assert_eq!(report.queue.processed, 2);
    assert_eq!(report.queue.failed, 1);
    assert_eq!(session.closed_windows().len(), 2);

    // 失败的条目仍在列表中，其余两个已转办
    let remaining: Vec<String> = session.with(|s| {
        s.window()
            .elements
            .iter()
            .filter(|e| e.id.contains("imgbtnEdit"))
            .map(|e| e.id.clone())
            .collect()
    });
    assert_eq!(remaining, vec![item_control_id(0)]);
    assert_eq!(session.count_log(&format!("click:{}", item_control_id(0))), 1);
    // 恢复时回到工作队列
    assert!(session.count_log(&format!("goto:{}", config.queue_url())) >= 2);
}

#[tokio::test(start_paused = true)]
async fn test_lost_unit_after_item_halts_the_queue() {
    let config = test_config();
    let session = FakeSession::new();
    inside_unit_queue(&session);
    inside_items(&session, 3);
    item_form(&session, &config);

    // 提交后会话回到部门选择页面，且部门无法确认
    let first = item_control_id(0);
    session.on_click(&item_control_id(0), move |s| {
        s.opened = Some(first.clone());
        s.remove(selectors::RECEIVE_HEADER_ID);
        s.remove(selectors::INSIDE_HEADER_ID);
        s.add(Element::select(selectors::UNIT_SELECTOR_ID, &[("1", "GERÊNCIA")]));
        s.add(Element::input("submit", selectors::UNIT_CONFIRM_ID));
    });

    let (reporter, mut rx) = StatusReporter::channel(512);
    let mut app = App::with_session(config, Box::new(session.clone()), reporter);
    let err = app.run().await.unwrap_err();

    assert!(matches!(err, AppError::Navigation(_)));
    assert_eq!(app.state(), BatchState::Fatal);
    assert!(session.released());
    // 后面的条目没有被打开
    assert_eq!(session.count_log(&format!("click:{}", item_control_id(1))), 0);
    assert_eq!(session.count_log("click:ctl00_ContentCampos_Button1"), 1);

    let (texts, progress) = drain(&mut rx);
    assert!(texts.last().is_some_and(|t| t.starts_with("❌")));
    assert_eq!(progress.last().copied(), Some(0.0));
}

#[tokio::test(start_paused = true)]
async fn test_intake_without_batch_button_keeps_selection_only() {
    let config = test_config();
    let session = FakeSession::new();
    inside_unit_queue(&session);
    receive_list(&session, &["GERÊNCIA DE BENEFÍCIOS"]);
    session.with(|s| s.remove(selectors::RECEIVE_BATCH_ID));

    let rule = BlockRule::new(config.blocked_origins.as_slice());
    let report = receive_items(&session, &config, &rule, &StatusReporter::disabled()).await;

    assert_eq!(report.received.len(), 1);
    assert_eq!(report.acknowledgement, None);
}

#[tokio::test(start_paused = true)]
async fn test_item_flow_on_open_item() {
    let config = test_config();
    let session = FakeSession::new();
    item_form(&session, &config);

    let payload = ObservationPayload::for_signer("MARIA SOUZA").unwrap();
    let flow = ItemFlow::new(&config, payload);
    let outcome = flow.run(&session, &ItemCtx::new(1, 1, 0)).await.unwrap();

    assert_eq!(
        outcome.submit.acknowledgement.as_deref(),
        Some("Processo tramitado com sucesso.")
    );
    assert_eq!(outcome.sync.strategy, Some("已知字段"));
    assert_eq!(outcome.close.new_windows, 1);
    assert_eq!(outcome.close.in_place, None);
    assert_eq!(
        session.value_of(selectors::REVIEW_OPINION_ID).as_deref(),
        Some("3")
    );
    assert_eq!(
        session.value_of(selectors::RESPONSIBLE_NAME_ID).as_deref(),
        Some("Maria Souza")
    );
}
