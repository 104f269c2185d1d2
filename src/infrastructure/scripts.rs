//! 页面端脚本
//!
//! 每个脚本都是 `(function(args){ PRELUDE; BODY })(ARGS)` 形式，
//! 参数统一通过 JSON 注入，避免字符串拼接转义问题。

use serde_json::Value as JsonValue;

/// 公共辅助函数：文档解析、定位器解释、事件派发、字段写入
pub const PRELUDE: &str = r#"
function __doc(frame) {
    if (frame === null || frame === undefined) return document;
    try { var w = window.frames[frame]; return w ? w.document : null; } catch (e) { return null; }
}
function __norm(s) { return String(s || '').replace(/\s+/g, ' ').trim(); }
function __visible(el) {
    try {
        if (!(el.offsetWidth || el.offsetHeight || el.getClientRects().length)) return false;
        var st = window.getComputedStyle(el);
        return st.visibility !== 'hidden' && st.display !== 'none';
    } catch (e) { return false; }
}
function __find(doc, loc) {
    if (!doc || !loc) return [];
    var all = function (sel) { try { return Array.from(doc.querySelectorAll(sel)); } catch (e) { return []; } };
    switch (loc.kind) {
        case 'id': { var el = doc.getElementById(loc.id); return el ? [el] : []; }
        case 'name': return Array.from(doc.getElementsByName(loc.name));
        case 'id_contains':
            return all(loc.tag || '*').filter(function (el) {
                var id = el.id || '';
                return loc.all.every(function (p) { return id.includes(p); })
                    && (loc.any.length === 0 || loc.any.some(function (p) { return id.includes(p); }));
            });
        case 'text':
            return all(loc.tag).filter(function (el) {
                var t = __norm(el.innerText || el.textContent);
                return loc.exact ? t === loc.text : t.includes(loc.text);
            });
        case 'control':
            return all('input[type="submit"], input[type="button"], button').filter(function (el) {
                var t = __norm(el.value || el.innerText || el.textContent).toLowerCase();
                return t.includes(String(loc.label).toLowerCase());
            });
        case 'editable':
            return all('body[contenteditable="true"], [contenteditable="true"]');
        case 'observation_fields':
            return all('textarea, input[type="hidden"], input[type="text"]').filter(function (el) {
                var id = (el.id || '').toLowerCase();
                var nm = (el.name || '').toLowerCase();
                var mk = String(loc.marker).toLowerCase();
                return id.includes(mk) || nm.includes(mk) || el.id === loc.id || el.name === loc.name;
            });
    }
    return [];
}
function __fire(el) {
    ['input', 'keyup', 'change', 'blur'].forEach(function (evt) {
        try { el.dispatchEvent(new Event(evt, { bubbles: true })); } catch (e) {}
    });
}
function __textLen(el) { return String(el.value || el.textContent || '').trim().length; }
function __write(el, text) {
    try { el.removeAttribute('disabled'); } catch (e) {}
    try { el.disabled = false; } catch (e) {}
    try { el.value = text; } catch (e) {}
    try { if ((el.tagName || '').toLowerCase() === 'textarea') { el.textContent = text; } } catch (e) {}
    try { el.setAttribute('value', text); } catch (e) {}
    __fire(el);
}
"#;

pub const COUNT: &str = r#"
return __find(__doc(args.frame), args.loc).length;
"#;

pub const IS_VISIBLE: &str = r#"
return __find(__doc(args.frame), args.loc).some(__visible);
"#;

// 点击放到 setTimeout 中执行，原生对话框不会阻塞本次 evaluate
pub const CLICK: &str = r#"
var el = __find(document, args.loc)[args.nth];
if (!el) return false;
try { el.scrollIntoView({ block: 'center' }); } catch (e) {}
setTimeout(function () { try { el.click(); } catch (e) {} }, 0);
return true;
"#;

pub const OPTIONS: &str = r#"
var el = __find(document, args.loc)[0];
if (!el || !el.options) return [];
return Array.from(el.options).map(function (o) { return { value: o.value, label: __norm(o.text) }; });
"#;

pub const SELECT_VALUE: &str = r#"
var el = __find(document, args.loc)[0];
if (!el || !el.options) return false;
var hit = Array.from(el.options).some(function (o) { return o.value === args.value; });
if (!hit) return false;
el.value = args.value;
setTimeout(function () { try { el.dispatchEvent(new Event('change', { bubbles: true })); } catch (e) {} }, 0);
return true;
"#;

pub const PREPARE_TYPING: &str = r#"
var el = __find(document, args.loc)[0];
if (!el) return false;
try { el.removeAttribute('disabled'); } catch (e) {}
try { el.disabled = false; } catch (e) {}
try { el.scrollIntoView({ block: 'center' }); } catch (e) {}
try { el.value = ''; } catch (e) {}
try { el.focus(); } catch (e) {}
return document.activeElement === el;
"#;

pub const FIRE_EVENTS: &str = r#"
var el = __find(document, args.loc)[0];
if (!el) return false;
__fire(el);
return true;
"#;

pub const TABLE_ROW: &str = r#"
var el = __find(document, args.loc)[args.nth];
if (!el) return null;
var row = el.closest('tr');
if (!row) return null;
var table = row.closest('table');
var first = table ? table.querySelector('tr') : null;
var header = first ? Array.from(first.querySelectorAll('th, td')).map(function (c) { return __norm(c.innerText); }) : [];
var cells = Array.from(row.children).filter(function (c) { return c.tagName === 'TD'; }).map(function (c) { return __norm(c.innerText); });
return { header: header, cells: cells, text: __norm(row.innerText) };
"#;

pub const FRAME_COUNT: &str = r#"
return window.frames.length;
"#;

pub const EDITOR_FRAMES: &str = r#"
var out = [];
Array.from(document.querySelectorAll('iframe, frame')).forEach(function (f) {
    var key = (f.id || '') + ' ' + (f.name || '');
    if (!args.hints.some(function (h) { return key.includes(h); })) return;
    for (var i = 0; i < window.frames.length; i++) {
        if (window.frames[i] === f.contentWindow) { out.push(i); break; }
    }
});
return out;
"#;

pub const FILL_FRAME_BODY: &str = r#"
var doc = __doc(args.frame);
if (!doc || !doc.body) return null;
try { doc.body.focus(); } catch (e) {}
doc.body.innerHTML = args.html;
__fire(doc.body);
return String(doc.body.innerText || doc.body.textContent || '').trim().length;
"#;

pub const FILL_EDITABLES: &str = r#"
var eds = __find(__doc(args.frame), { kind: 'editable' });
if (args.first_only) eds = eds.slice(0, 1);
return eds.map(function (el) {
    try { el.scrollIntoView({ block: 'center' }); el.focus(); } catch (e) {}
    el.innerHTML = args.html;
    __fire(el);
    return String(el.innerText || el.textContent || '').trim().length;
});
"#;

pub const EDITABLE_LEN: &str = r#"
var el = __find(__doc(args.frame), { kind: 'editable' })[0];
return el ? String(el.innerText || '').trim().length : 0;
"#;

pub const WRITE_FIELDS: &str = r#"
var els = __find(__doc(args.frame), args.loc);
els.forEach(function (el) { __write(el, args.text); });
return els.length;
"#;

pub const FIELD_LEN: &str = r#"
var el = __find(__doc(args.frame), args.loc)[0];
return el ? __textLen(el) : 0;
"#;

pub const DESCRIBE_FIELDS: &str = r#"
return __find(__doc(args.frame), args.loc).map(function (el) {
    return {
        id: el.id || '',
        name: el.name || '',
        kind: el.type || (el.tagName || '').toLowerCase(),
        disabled: !!el.disabled,
        length: __textLen(el)
    };
});
"#;

pub const APPEND_HIDDEN: &str = r#"
var doc = __doc(args.frame);
if (!doc) return false;
var form = doc.querySelector('form');
if (!form) return false;
var input = doc.createElement('input');
input.type = 'hidden';
input.id = args.id;
input.name = args.name;
form.appendChild(input);
return true;
"#;

pub const CLIENT_VALIDATE: &str = r#"
if (typeof window.Page_ClientValidate !== 'function') return false;
try { window.Page_ClientValidate(args.group); } catch (e) {}
return true;
"#;

pub const POSTBACK: &str = r#"
if (args.group !== null && args.group !== undefined) {
    if (typeof window.WebForm_DoPostBackWithOptions !== 'function') return false;
    setTimeout(function () {
        WebForm_DoPostBackWithOptions(new WebForm_PostBackOptions(args.target, '', true, args.group, '', false, false));
    }, 0);
    return true;
}
if (typeof window.__doPostBack !== 'function') return false;
setTimeout(function () { __doPostBack(args.target, ''); }, 0);
return true;
"#;

pub const HISTORY_BACK: &str = r#"
setTimeout(function () { history.back(); }, 0);
return true;
"#;

/// 组装完整脚本
pub fn build(body: &str, args: &JsonValue) -> String {
    format!("(function(args){{\n{}\n{}\n}})({})", PRELUDE, body, args)
}
