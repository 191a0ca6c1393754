pub(crate) const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>PPE Detection System</title>
    <style>
        :root { color-scheme: dark; }
        body { margin: 0; font-family: sans-serif; background: #111; color: #eee; display: flex; min-height: 100vh; }
        aside { width: 300px; padding: 16px; background: #1b1d22; box-sizing: border-box; }
        main { flex: 1; padding: 16px; }
        h1 { font-size: 1.4em; margin-top: 0; }
        h2 { font-size: 1.1em; margin-bottom: 6px; }
        img.stream { max-width: 100%; background: #000; border-radius: 4px; }
        ul { padding-left: 18px; margin: 4px 0; }
        .ok { color: #5c5; }
        .bad { color: #e55; }
        .muted { color: #888; }
        .error { background: #522; padding: 8px; border-radius: 4px; }
        progress { width: 100%; }
        button, select { width: 100%; padding: 6px; margin-top: 6px; }
    </style>
</head>
<body>
<aside>
    <h2>Select Site</h2>
    <select id="site"></select>
    <div id="mode" class="muted"></div>
    <div id="required-block">
        <h2>Required PPE</h2>
        <ul id="required"></ul>
    </div>
    <h2>Detected Items</h2>
    <ul id="detected"></ul>
    <div id="alerts-block">
        <h2>Alert Status</h2>
        <div id="alert-status"></div>
        <progress id="cooldown" max="1" value="0"></progress>
        <h2>Recent Alerts</h2>
        <ul id="history"></ul>
    </div>
    <button id="stop">Stop Camera</button>
</aside>
<main>
    <h1>PPE Detection System</h1>
    <div id="camera-error" class="error" hidden></div>
    <img class="stream" src="/stream.mjpg" alt="Live feed">
</main>
<script>
const $ = (id) => document.getElementById(id);

function fill(list, items, render) {
    list.innerHTML = "";
    for (const item of items) {
        const li = document.createElement("li");
        render(li, item);
        list.appendChild(li);
    }
}

async function loadSites() {
    const sites = await (await fetch("/api/sites")).json();
    const select = $("site");
    select.innerHTML = "";
    for (const site of sites) {
        const option = document.createElement("option");
        option.value = site.key;
        option.textContent = site.name;
        select.appendChild(option);
    }
}

async function refresh() {
    const s = await (await fetch("/api/status")).json();
    if (document.activeElement !== $("site")) { $("site").value = s.site; }
    $("mode").textContent = s.mode_label;

    const enforcing = s.mode === "enforce";
    $("required-block").hidden = !enforcing;
    $("alerts-block").hidden = !enforcing;

    fill($("required"), s.required_ppe, (li, item) => {
        const present = !s.missing.includes(item);
        li.textContent = item;
        li.className = present ? "ok" : "bad";
    });
    fill($("detected"), s.detected, (li, item) => { li.textContent = item; });

    $("alert-status").textContent = s.alerting_configured ? s.alert_status : "Twilio not configured";
    $("cooldown").value = s.cooldown_fraction;
    if (s.history.length === 0) {
        fill($("history"), ["No alerts sent yet"], (li, item) => { li.textContent = item; li.className = "muted"; });
    } else {
        fill($("history"), s.history, (li, r) => {
            li.textContent = r.timestamp + " " + r.message;
            li.className = r.status === "success" ? "ok" : "bad";
        });
    }

    $("camera-error").hidden = !s.camera_error;
    $("camera-error").textContent = s.camera_error || "";
    $("stop").disabled = !s.camera_active;
}

$("site").addEventListener("change", async (e) => {
    await fetch("/api/site", {
        method: "POST",
        headers: { "Content-Type": "application/json" },
        body: JSON.stringify({ site: e.target.value }),
    });
});

$("stop").addEventListener("click", async () => {
    await fetch("/api/camera/stop", { method: "POST" });
});

loadSites().then(refresh);
setInterval(() => refresh().catch(() => {}), 1000);
</script>
</body>
</html>
"#;
